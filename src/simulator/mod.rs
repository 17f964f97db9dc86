pub mod integrator;
pub mod models;
pub mod observer;
mod options;
mod parameters;
mod system;

pub use integrator::{integrate, integrate_observed, step, stiffness_ratio, Trajectory};
pub use observer::{CancelFlag, NoopObserver, RunCounter, SolveObserver};
pub use options::{Method, SolverOptions, MAX_STEPS};
pub use parameters::Parameters;
pub use system::{DiffEq, OdeSystem};

type T = f64;
/// State vector type shared by every model system
pub type V = nalgebra::DVector<T>;
