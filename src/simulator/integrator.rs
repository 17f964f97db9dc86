//! Fixed-step explicit integration.
//!
//! Two schemes are available through [Method]: forward Euler (global error O(h)) and the
//! classical fourth-order Runge-Kutta (global error O(h⁴)). The step size is fixed for the whole
//! window; there is no error control, so stiff parameter regimes (e.g. a fast transit chain
//! combined with a coarse step) can produce inaccurate or unstable output. See [stiffness_ratio].

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::simulator::{
    DiffEq, Method, NoopObserver, OdeSystem, Parameters, SolveObserver, SolverOptions, V,
};
use crate::PkError;

/// Sampled solution of an [OdeSystem]: one full state vector per time point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[Vec<f64>] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values of a single state across the trajectory
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|x| x[index]).collect()
    }

    /// Sum of all states at every sample (total amount for amount-based systems)
    pub fn totals(&self) -> Vec<f64> {
        self.states.iter().map(|x| x.iter().sum()).collect()
    }

    /// States as a matrix with one row per sample and one column per state
    pub fn to_array2(&self) -> Array2<f64> {
        let ncols = self.states.first().map_or(0, |x| x.len());
        let mut matrix = Array2::zeros((self.states.len(), ncols));
        for (i, x) in self.states.iter().enumerate() {
            for (j, &value) in x.iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        matrix
    }
}

/// Reusable stage buffers so that stepping does not allocate
struct Stepper<'a> {
    diffeq: &'a DiffEq,
    params: &'a Parameters,
    method: Method,
    k1: V,
    k2: V,
    k3: V,
    k4: V,
    tmp: V,
}

impl<'a> Stepper<'a> {
    fn new(diffeq: &'a DiffEq, params: &'a Parameters, method: Method, nstates: usize) -> Self {
        Self {
            diffeq,
            params,
            method,
            k1: V::zeros(nstates),
            k2: V::zeros(nstates),
            k3: V::zeros(nstates),
            k4: V::zeros(nstates),
            tmp: V::zeros(nstates),
        }
    }

    #[inline(always)]
    fn eval(diffeq: &DiffEq, params: &Parameters, t: f64, x: &V, dx: &mut V) {
        dx.fill(0.0);
        diffeq(x, params, t, dx);
    }

    /// Advance `y` in place from `t` to `t + h`
    fn advance(&mut self, t: f64, y: &mut V, h: f64) {
        match self.method {
            Method::Euler => {
                Self::eval(self.diffeq, self.params, t, y, &mut self.k1);
                y.axpy(h, &self.k1, 1.0);
            }
            Method::Rk4 => {
                let half = h / 2.0;
                Self::eval(self.diffeq, self.params, t, y, &mut self.k1);

                self.tmp.copy_from(y);
                self.tmp.axpy(half, &self.k1, 1.0);
                Self::eval(self.diffeq, self.params, t + half, &self.tmp, &mut self.k2);

                self.tmp.copy_from(y);
                self.tmp.axpy(half, &self.k2, 1.0);
                Self::eval(self.diffeq, self.params, t + half, &self.tmp, &mut self.k3);

                self.tmp.copy_from(y);
                self.tmp.axpy(h, &self.k3, 1.0);
                Self::eval(self.diffeq, self.params, t + h, &self.tmp, &mut self.k4);

                // y + h (k1 + 2 k2 + 2 k3 + k4) / 6
                self.tmp.copy_from(&self.k1);
                self.tmp.axpy(2.0, &self.k2, 1.0);
                self.tmp.axpy(2.0, &self.k3, 1.0);
                self.tmp.axpy(1.0, &self.k4, 1.0);
                y.axpy(h / 6.0, &self.tmp, 1.0);
            }
        }
    }
}

/// Take a single step of size `h` from `(t, y)`.
///
/// The derivative closure must accept state vectors of the length of `y`.
pub fn step(diffeq: &DiffEq, t: f64, y: &V, h: f64, params: &Parameters, method: Method) -> V {
    let mut next = y.clone();
    Stepper::new(diffeq, params, method, y.len()).advance(t, &mut next, h);
    next
}

/// Integrate a system over the window described by `options`.
///
/// Samples are recorded at `start_time + k * step_size` for every `k` whose time does not pass
/// `end_time`. The last sample can therefore fall up to one step short of `end_time`.
pub fn integrate(system: &OdeSystem, options: &SolverOptions) -> Result<Trajectory, PkError> {
    integrate_observed(system, options, &NoopObserver)
}

/// Same as [integrate], polling `observer` for cancellation between steps.
///
/// Returns [PkError::Cancelled] with the time of the last recorded sample if the observer asks
/// to stop.
pub fn integrate_observed(
    system: &OdeSystem,
    options: &SolverOptions,
    observer: &dyn SolveObserver,
) -> Result<Trajectory, PkError> {
    options.validate()?;

    let nsteps = options.nsteps()?;
    let h = options.step_size;
    let mut times = Vec::with_capacity(nsteps + 1);
    let mut states = Vec::with_capacity(nsteps + 1);

    let mut y = system.initial_state().clone();
    let mut stepper = Stepper::new(
        system.diffeq(),
        system.parameters(),
        options.method,
        system.nstates(),
    );

    for k in 0..=nsteps {
        let t = sample_time(options, k);
        times.push(t);
        states.push(y.as_slice().to_vec());

        if k == nsteps {
            break;
        }
        if observer.is_cancelled() {
            return Err(PkError::Cancelled { time: t });
        }
        stepper.advance(t, &mut y, h);
    }

    Ok(Trajectory { times, states })
}

/// Time of the `k`-th grid point, never past `end_time`
#[inline(always)]
pub(crate) fn sample_time(options: &SolverOptions, k: usize) -> f64 {
    (options.start_time + k as f64 * options.step_size).min(options.end_time)
}

/// Ratio between `rate * step_size` and the method's stability limit.
///
/// Values above 1 mean a first-order process with this rate constant is outside the stability
/// region of the explicit scheme; a warning is logged in that case.
pub fn stiffness_ratio(fastest_rate: f64, options: &SolverOptions) -> f64 {
    let ratio = fastest_rate.abs() * options.step_size / options.method.stability_limit();
    if ratio > 1.0 {
        log::warn!(
            "step size {} is too coarse for rate constant {} with {} (stiffness ratio {:.2}); \
             output may be inaccurate or unstable",
            options.step_size,
            fastest_rate,
            options.method,
            ratio
        );
    }
    ratio
}
