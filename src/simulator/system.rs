use std::fmt;
use std::sync::Arc;

use crate::simulator::{Parameters, V};
use crate::PkError;

/// This closure represents the differential equation of a model system:
/// Params:
/// - x: The state vector at time t
/// - p: The resolved parameters of the system
/// - t: The time at which the differential equation is evaluated
/// - dx: A mutable reference to the derivative of the state vector at time t
///
/// `dx` arrives zeroed and has the same length as `x`.
/// Example:
/// ```ignore
/// use pksim::*;
/// let ke = 0.2;
/// let diffeq: DiffEq = std::sync::Arc::new(move |x: &V, _p: &Parameters, _t: f64, dx: &mut V| {
///     dx[0] = -ke * x[0];
/// });
/// ```
pub type DiffEq = Arc<dyn Fn(&V, &Parameters, f64, &mut V) + Send + Sync>;

/// A fully resolved ODE system, ready to be integrated.
///
/// Holds the derivative closure, the initial amounts in every compartment, and the parameter
/// values (inputs with defaults filled in, plus derived rate constants) used to build it.
#[derive(Clone)]
pub struct OdeSystem {
    diffeq: DiffEq,
    initial_state: V,
    parameters: Parameters,
    nstates: usize,
    central: usize,
}

impl OdeSystem {
    /// Create a new system.
    ///
    /// `nstates` is the number of states the derivative closure reads and writes; the initial
    /// state must have exactly that length.
    pub fn new(
        diffeq: DiffEq,
        initial_state: V,
        parameters: Parameters,
        nstates: usize,
    ) -> Result<Self, PkError> {
        if initial_state.len() != nstates {
            return Err(PkError::DimensionMismatch {
                expected: nstates,
                found: initial_state.len(),
            });
        }
        Ok(Self {
            diffeq,
            initial_state,
            parameters,
            nstates,
            central: 0,
        })
    }

    /// Mark which state holds the central compartment (defaults to 0).
    ///
    /// An index past the last state is a [PkError::DimensionMismatch]: the layout would need
    /// `central + 1` states.
    pub fn with_central(mut self, central: usize) -> Result<Self, PkError> {
        if central >= self.nstates {
            return Err(PkError::DimensionMismatch {
                expected: central + 1,
                found: self.nstates,
            });
        }
        self.central = central;
        Ok(self)
    }

    #[inline(always)]
    pub fn diffeq(&self) -> &DiffEq {
        &self.diffeq
    }

    pub fn initial_state(&self) -> &V {
        &self.initial_state
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn nstates(&self) -> usize {
        self.nstates
    }

    /// Index of the central compartment in the state vector
    pub fn central(&self) -> usize {
        self.central
    }

    /// Evaluate the derivative at `(t, x)`
    pub fn derivative(&self, t: f64, x: &V) -> V {
        let mut dx = V::zeros(self.nstates);
        (self.diffeq)(x, &self.parameters, t, &mut dx);
        dx
    }
}

impl fmt::Debug for OdeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdeSystem")
            .field("initial_state", &self.initial_state.as_slice())
            .field("parameters", &self.parameters)
            .field("nstates", &self.nstates)
            .field("central", &self.central)
            .finish()
    }
}
