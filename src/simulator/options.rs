use serde::{Deserialize, Serialize};

use crate::PkError;

/// Most steps a single integration may take; longer grids are rejected as invalid options
pub const MAX_STEPS: usize = 10_000_000;

/// Stepping scheme used by the fixed-step integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Classical fourth-order Runge-Kutta
    #[default]
    Rk4,
    /// Forward Euler
    Euler,
}

impl Method {
    /// Upper bound of the stability interval on the negative real axis.
    ///
    /// A linear decay `dx/dt = -k x` stays bounded as long as `k * h` is below this value.
    pub fn stability_limit(&self) -> f64 {
        match self {
            Method::Rk4 => 2.785,
            Method::Euler => 2.0,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Rk4 => write!(f, "rk4"),
            Method::Euler => write!(f, "euler"),
        }
    }
}

/// Time window and stepping configuration for a single integration.
///
/// Missing fields take their defaults when deserialized, so a partial JSON object such as
/// `{"endTime": 48}` is a valid configuration.
///
/// # Example
///
/// ```ignore
/// use pksim::*;
///
/// let options = SolverOptions::default()
///     .with_end_time(48.0)
///     .with_step_size(0.05)
///     .with_method(Method::Euler);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverOptions {
    #[serde(alias = "tStart")]
    pub start_time: f64,
    #[serde(alias = "tEnd")]
    pub end_time: f64,
    pub step_size: f64,
    pub method: Method,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 24.0,
            step_size: 0.1,
            method: Method::Rk4,
        }
    }
}

impl SolverOptions {
    pub fn new(start_time: f64, end_time: f64, step_size: f64, method: Method) -> Self {
        Self {
            start_time,
            end_time,
            step_size,
            method,
        }
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Parse options from a JSON object, filling absent fields with defaults
    pub fn from_json(json: &str) -> Result<Self, PkError> {
        let options: SolverOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check the invariants the integrator relies on.
    ///
    /// A non-positive step would never reach `end_time`, so it is rejected up front.
    pub fn validate(&self) -> Result<(), PkError> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(PkError::invalid_options(format!(
                "step size must be positive and finite, got {}",
                self.step_size
            )));
        }
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(PkError::invalid_options(format!(
                "time window must be finite, got [{}, {}]",
                self.start_time, self.end_time
            )));
        }
        if self.end_time < self.start_time {
            return Err(PkError::invalid_options(format!(
                "end time {} is before start time {}",
                self.end_time, self.start_time
            )));
        }
        self.nsteps().map(|_| ())
    }

    /// Number of whole steps that fit in the window, at most [MAX_STEPS]
    pub(crate) fn nsteps(&self) -> Result<usize, PkError> {
        // The small slack absorbs representation error, e.g. 24.0 / 0.1
        let steps = ((self.end_time - self.start_time) / self.step_size + 1e-9).floor();
        if !steps.is_finite() || steps > MAX_STEPS as f64 {
            return Err(PkError::invalid_options(format!(
                "window [{}, {}] at step size {} needs more than {} steps",
                self.start_time, self.end_time, self.step_size, MAX_STEPS
            )));
        }
        Ok(steps as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_window() {
        let options = SolverOptions::default();
        assert_eq!(options.start_time, 0.0);
        assert_eq!(options.end_time, 24.0);
        assert_eq!(options.step_size, 0.1);
        assert_eq!(options.method, Method::Rk4);
        assert_eq!(options.nsteps().unwrap(), 240);
    }

    #[test]
    fn rejects_non_positive_step() {
        let zero = SolverOptions::default().with_step_size(0.0);
        assert!(matches!(zero.validate(), Err(PkError::InvalidOptions(_))));

        let negative = SolverOptions::default().with_step_size(-0.1);
        assert!(matches!(negative.validate(), Err(PkError::InvalidOptions(_))));

        let nan = SolverOptions::default().with_step_size(f64::NAN);
        assert!(matches!(nan.validate(), Err(PkError::InvalidOptions(_))));
    }

    #[test]
    fn rejects_reversed_window() {
        let options = SolverOptions::default().with_start_time(10.0).with_end_time(5.0);
        assert!(matches!(options.validate(), Err(PkError::InvalidOptions(_))));
    }

    #[test]
    fn empty_window_is_valid() {
        let options = SolverOptions::default().with_start_time(3.0).with_end_time(3.0);
        assert!(options.validate().is_ok());
        assert_eq!(options.nsteps().unwrap(), 0);
    }

    #[test]
    fn rejects_grids_longer_than_the_step_cap() {
        let huge = SolverOptions::new(0.0, 1e19, 1.0, Method::Rk4);
        assert!(matches!(huge.validate(), Err(PkError::InvalidOptions(_))));

        let tiny_step = SolverOptions::new(0.0, 24.0, f64::MIN_POSITIVE, Method::Rk4);
        assert!(matches!(tiny_step.validate(), Err(PkError::InvalidOptions(_))));

        let at_cap = SolverOptions::new(0.0, MAX_STEPS as f64, 1.0, Method::Euler);
        assert_eq!(at_cap.nsteps().unwrap(), MAX_STEPS);
        let past_cap = at_cap.with_end_time(MAX_STEPS as f64 + 1.0);
        assert!(past_cap.validate().is_err());
    }

    #[test]
    fn parses_partial_camel_case_json() {
        let options = SolverOptions::from_json(r#"{"endTime": 48, "method": "euler"}"#).unwrap();
        assert_eq!(options.end_time, 48.0);
        assert_eq!(options.step_size, 0.1);
        assert_eq!(options.method, Method::Euler);

        let legacy = SolverOptions::from_json(r#"{"tStart": 1, "tEnd": 2, "stepSize": 0.5}"#).unwrap();
        assert_eq!(legacy.start_time, 1.0);
        assert_eq!(legacy.end_time, 2.0);
        assert_eq!(legacy.nsteps().unwrap(), 2);
    }

    #[test]
    fn json_validation_errors_surface() {
        assert!(matches!(
            SolverOptions::from_json(r#"{"stepSize": -1}"#),
            Err(PkError::InvalidOptions(_))
        ));
        assert!(matches!(
            SolverOptions::from_json(r#"{"method": "bdf"}"#),
            Err(PkError::Json(_))
        ));
    }
}
