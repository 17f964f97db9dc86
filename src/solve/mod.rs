//! Concentration-time profiles from registered models.
//!
//! [Simulator] ties a [ModelRegistry] to a [SolveObserver]: it resolves the model, integrates
//! its system and converts the central compartment into concentrations. The free functions
//! [solve_model] and [solve_regimen] use the built-in registry without an observer.
//!
//! ```rust,ignore
//! use pksim::*;
//!
//! let counter = RunCounter::new();
//! let simulator = Simulator::builtin().with_observer(counter.clone());
//!
//! let profile = simulator.solve_model(
//!     "1-compartment-oral",
//!     &params! { "ka" => 1.5, "CL" => 2.0, "V" => 10.0 },
//!     100.0,
//!     &SolverOptions::default(),
//! )?;
//! println!("Cmax {:?} after {} runs", profile.peak(), counter.count());
//! ```

mod batch;
mod regimen;

pub use regimen::{PatientDoseRegimen, Regimen};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::simulator::models::{ModelDefinition, ModelRegistry};
use crate::simulator::{
    integrate_observed, stiffness_ratio, NoopObserver, OdeSystem, Parameters, SolveObserver,
    SolverOptions, Trajectory,
};
use crate::PkError;

/// Paired sample times and concentrations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub time: Vec<f64>,
    pub concentration: Vec<f64>,
}

impl Profile {
    pub fn new(time: Vec<f64>, concentration: Vec<f64>) -> Self {
        debug_assert_eq!(time.len(), concentration.len());
        Self {
            time,
            concentration,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// `(time, concentration)` pairs in order
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.concentration.iter().copied())
    }

    /// Time and value of the highest finite concentration
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.points()
            .filter(|(_, c)| c.is_finite())
            .fold(None, |best, (t, c)| match best {
                Some((_, cmax)) if cmax >= c => best,
                _ => Some((t, c)),
            })
    }

    /// Keep only points that can be drawn on a log axis: finite time, finite positive concentration
    pub fn retain_plottable(mut self) -> Self {
        let (time, concentration) = self
            .points()
            .filter(|&(t, c)| is_plottable(t, c))
            .unzip();
        self.time = time;
        self.concentration = concentration;
        self
    }
}

#[inline(always)]
pub(crate) fn is_plottable(time: f64, concentration: f64) -> bool {
    time.is_finite() && concentration.is_finite() && concentration > 0.0
}

/// Entry point for solving models from a registry
#[derive(Clone)]
pub struct Simulator {
    registry: Arc<ModelRegistry>,
    observer: Arc<dyn SolveObserver>,
}

impl Simulator {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Simulator over the shared built-in registry
    pub fn builtin() -> Self {
        Self::new(ModelRegistry::shared())
    }

    pub fn with_observer(mut self, observer: impl SolveObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Integrate a model and return every state, not just the concentration
    pub fn trajectory(
        &self,
        model_id: &str,
        parameters: &Parameters,
        dose: f64,
        options: &SolverOptions,
    ) -> Result<Trajectory, PkError> {
        let model = self.registry.resolve(model_id)?;
        let system = model.build_system(parameters, dose)?;
        stiffness_ratio(model.fastest_rate(system.parameters()), options);
        let trajectory = integrate_observed(&system, options, self.observer.as_ref())?;
        self.observer.on_run(model_id, trajectory.len());
        Ok(trajectory)
    }

    /// Concentration-time profile of a single dose given at time zero.
    ///
    /// The central state is divided by the model's central volume. Values are not filtered:
    /// a degenerate volume shows up as non-finite concentrations.
    pub fn solve_model(
        &self,
        model_id: &str,
        parameters: &Parameters,
        dose: f64,
        options: &SolverOptions,
    ) -> Result<Profile, PkError> {
        let model = self.registry.resolve(model_id)?;
        let system = model.build_system(parameters, dose)?;
        stiffness_ratio(model.fastest_rate(system.parameters()), options);
        self.run(model, model_id, &system, parameters, options)
    }

    /// Composite profile of a multi-dose regimen, built by dose superposition
    pub fn solve_regimen(
        &self,
        model_id: &str,
        parameters: &Parameters,
        regimen: &Regimen,
        options: &SolverOptions,
    ) -> Result<Profile, PkError> {
        let model = self.registry.resolve(model_id)?;
        regimen::superpose(self, model, model_id, parameters, regimen, options)
    }

    /// Integrate a built system and convert its central compartment
    pub(crate) fn run(
        &self,
        model: &dyn ModelDefinition,
        model_id: &str,
        system: &OdeSystem,
        parameters: &Parameters,
        options: &SolverOptions,
    ) -> Result<Profile, PkError> {
        let trajectory = integrate_observed(system, options, self.observer.as_ref())?;
        self.observer.on_run(model_id, trajectory.len());

        let central = system.central();
        let concentration = trajectory
            .states()
            .iter()
            .map(|x| model.concentration(x[central], parameters))
            .collect();
        Ok(Profile::new(trajectory.times().to_vec(), concentration))
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Solve a built-in model for a single dose, see [Simulator::solve_model]
pub fn solve_model(
    model_id: &str,
    parameters: &Parameters,
    dose: f64,
    options: &SolverOptions,
) -> Result<Profile, PkError> {
    Simulator::builtin().solve_model(model_id, parameters, dose, options)
}

/// Solve a built-in model for a multi-dose regimen, see [Simulator::solve_regimen]
pub fn solve_regimen(
    model_id: &str,
    parameters: &Parameters,
    regimen: &Regimen,
    options: &SolverOptions,
) -> Result<Profile, PkError> {
    Simulator::builtin().solve_regimen(model_id, parameters, regimen, options)
}
