//! Pharmacokinetic profile simulation.
//!
//! Models are looked up by id in a [ModelRegistry], turned into an [OdeSystem] for a given set
//! of parameters and a dose, and integrated with a fixed-step scheme. The central compartment of
//! the result is reported as a concentration-time [Profile]; multiple dosing is handled by
//! superposition of single-dose profiles.
//!
//! ```rust,ignore
//! use pksim::prelude::*;
//!
//! let profile = solve_model(
//!     "2-compartment-iv",
//!     &params! { "V1" => 5.0, "V2" => 15.0, "CL" => 2.0, "Q" => 1.0 },
//!     100.0,
//!     &SolverOptions::new(0.0, 10.0, 0.5, Method::Rk4),
//! )?;
//! assert_eq!(profile.concentration[0], 20.0);
//! ```

pub mod error;
pub mod simulator;
pub mod solve;

pub use crate::error::PkError;
pub use crate::simulator::models::{
    Absorption, Compartmental, Disposition, Elimination, ModelDefinition, ModelRegistry, Route,
    Tmdd, TmddVariant,
};
pub use crate::simulator::{
    CancelFlag, DiffEq, Method, NoopObserver, OdeSystem, Parameters, RunCounter, SolveObserver,
    SolverOptions, Trajectory, MAX_STEPS,
};
pub use crate::solve::{
    solve_model, solve_regimen, PatientDoseRegimen, Profile, Regimen, Simulator,
};

pub mod prelude {
    pub mod simulator {
        pub use crate::simulator::{
            integrate, integrate_observed, step, stiffness_ratio, DiffEq, OdeSystem, Trajectory,
            V,
        };
    }
    pub mod models {
        pub use crate::simulator::models::{
            Absorption, Compartmental, Disposition, Elimination, ModelDefinition, ModelRegistry,
            Route, Tmdd, TmddVariant,
        };
    }

    pub use crate::params;
    pub use crate::{
        solve_model, solve_regimen, CancelFlag, Method, NoopObserver, Parameters,
        PatientDoseRegimen, PkError, Profile, Regimen, RunCounter, Simulator, SolveObserver,
        SolverOptions,
    };
}
