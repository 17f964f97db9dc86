//! Multiple dosing by superposition of single-dose profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::simulator::models::ModelDefinition;
use crate::simulator::{stiffness_ratio, Parameters, SolverOptions};
use crate::solve::{is_plottable, Profile, Simulator};
use crate::PkError;

/// Time after the last dose that a regimen profile always covers
const TAIL: f64 = 12.0;

/// Repeated equal doses given at a fixed interval, the first at time zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regimen {
    #[serde(alias = "dose")]
    pub dose_amount: f64,
    pub number_of_doses: usize,
    #[serde(alias = "frequency")]
    pub inter_dose_interval: f64,
}

impl Regimen {
    pub fn new(dose_amount: f64, number_of_doses: usize, inter_dose_interval: f64) -> Self {
        Self {
            dose_amount,
            number_of_doses,
            inter_dose_interval,
        }
    }

    /// A single dose at time zero
    pub fn single(dose_amount: f64) -> Self {
        Self::new(dose_amount, 1, 0.0)
    }

    pub fn from_json(json: &str) -> Result<Self, PkError> {
        let regimen: Regimen = serde_json::from_str(json)?;
        regimen.validate()?;
        Ok(regimen)
    }

    pub fn validate(&self) -> Result<(), PkError> {
        if self.number_of_doses == 0 {
            return Err(PkError::InvalidRegimen(
                "at least one dose is required".to_string(),
            ));
        }
        if !self.dose_amount.is_finite() {
            return Err(PkError::InvalidRegimen(format!(
                "dose amount must be finite, got {}",
                self.dose_amount
            )));
        }
        if !self.inter_dose_interval.is_finite() || self.inter_dose_interval < 0.0 {
            return Err(PkError::InvalidRegimen(format!(
                "inter-dose interval must be finite and non-negative, got {}",
                self.inter_dose_interval
            )));
        }
        Ok(())
    }

    /// Administration time of every dose
    pub fn dose_times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.number_of_doses).map(move |i| i as f64 * self.inter_dose_interval)
    }

    /// End of the composite profile: `TAIL` hours after the last interval, or `end_time` if later
    pub fn horizon(&self, end_time: f64) -> f64 {
        (self.number_of_doses as f64 * self.inter_dose_interval + TAIL).max(end_time)
    }
}

/// A regimen together with the parameters of the patient receiving it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDoseRegimen {
    #[serde(flatten)]
    pub regimen: Regimen,
    #[serde(default, alias = "modelParameters")]
    pub parameters: Parameters,
}

impl PatientDoseRegimen {
    pub fn new(regimen: Regimen, parameters: Parameters) -> Self {
        Self {
            regimen,
            parameters,
        }
    }
}

/// Sum single-dose profiles shifted to each dose time.
///
/// A single-dose regimen is exactly [Simulator::solve_model] over the caller's window: no horizon
/// extension and no filtering, whatever the interval.
///
/// With two or more doses, every dose time is snapped to the nearest multiple of `step_size` so
/// that all shifted profiles share one grid; contributions are added per grid index. Points that
/// are not finite or not positive are dropped from the result. The options' `start_time` is not
/// used: each dose is simulated from its own administration time.
pub(crate) fn superpose(
    simulator: &Simulator,
    model: &dyn ModelDefinition,
    model_id: &str,
    parameters: &Parameters,
    regimen: &Regimen,
    options: &SolverOptions,
) -> Result<Profile, PkError> {
    regimen.validate()?;
    options.validate()?;

    if regimen.number_of_doses == 1 {
        return simulator.solve_model(model_id, parameters, regimen.dose_amount, options);
    }
    if !model.is_linear() {
        log::warn!(
            "model {} is not linear; superposing {} doses is an approximation",
            model_id,
            regimen.number_of_doses
        );
    }

    let h = options.step_size;
    let horizon = regimen.horizon(options.end_time);
    let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
    let mut advised = false;

    for dose_time in regimen.dose_times() {
        let offset = (dose_time / h).round() as usize;
        let shifted = offset as f64 * h;
        if (shifted - dose_time).abs() > 1e-9 * dose_time.max(1.0) {
            log::warn!(
                "dose at t = {} does not fall on the {} grid, applied at t = {}",
                dose_time,
                h,
                shifted
            );
        }
        if shifted > horizon {
            continue;
        }

        let window = SolverOptions {
            start_time: 0.0,
            end_time: horizon - shifted,
            ..*options
        };
        let system = model.build_system(parameters, regimen.dose_amount)?;
        if !advised {
            stiffness_ratio(model.fastest_rate(system.parameters()), &window);
            advised = true;
        }
        let profile = simulator.run(model, model_id, &system, parameters, &window)?;

        for (k, concentration) in profile.concentration.iter().enumerate() {
            *merged.entry(offset + k).or_insert(0.0) += concentration;
        }
    }

    let (time, concentration) = merged
        .into_iter()
        .map(|(key, concentration)| ((key as f64 * h).min(horizon), concentration))
        .filter(|&(t, c)| is_plottable(t, c))
        .unzip();
    Ok(Profile::new(time, concentration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{params, solve_model, solve_regimen, Method, RunCounter};
    use approx::assert_relative_eq;

    #[test]
    fn single_dose_matches_solve_model() {
        let parameters = params! { "CL" => 2.0, "V" => 10.0 };
        let options = SolverOptions::default();
        let single = solve_model("1-compartment-iv", &parameters, 100.0, &options).unwrap();
        let regimen = solve_regimen(
            "1-compartment-iv",
            &parameters,
            &Regimen::single(100.0),
            &options,
        )
        .unwrap();
        assert_eq!(single, regimen);
    }

    #[test]
    fn second_dose_adds_to_trough() {
        let parameters = params! { "CL" => 2.0, "V" => 10.0 };
        let options = SolverOptions::default();
        let single = solve_model("1-compartment-iv", &parameters, 100.0, &options).unwrap();
        let profile = solve_regimen(
            "1-compartment-iv",
            &parameters,
            &Regimen::new(100.0, 2, 12.0),
            &options,
        )
        .unwrap();

        assert_eq!(profile.time[120], 12.0);
        assert_relative_eq!(
            profile.concentration[120],
            single.concentration[120] + single.concentration[0],
            max_relative = 1e-12
        );
        // Before the second dose the regimen follows the single-dose curve
        assert_eq!(profile.concentration[60], single.concentration[60]);
    }

    #[test]
    fn horizon_covers_tail_after_last_interval() {
        let regimen = Regimen::new(100.0, 3, 12.0);
        assert_eq!(regimen.horizon(24.0), 48.0);
        assert_eq!(regimen.horizon(72.0), 72.0);
        assert_eq!(regimen.dose_times().collect::<Vec<_>>(), vec![0.0, 12.0, 24.0]);

        let profile = solve_regimen(
            "1-compartment-iv",
            &params! {},
            &regimen,
            &SolverOptions::default().with_step_size(0.5),
        )
        .unwrap();
        assert_eq!(*profile.time.last().unwrap(), 48.0);
        assert!(profile.time.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn off_grid_doses_are_snapped() {
        let options = SolverOptions::new(0.0, 24.0, 0.5, Method::Rk4);
        let profile = solve_regimen(
            "1-compartment-iv",
            &params! {},
            &Regimen::new(100.0, 2, 6.2),
            &options,
        )
        .unwrap();
        // Second dose lands on t = 6.0
        let index = profile.time.iter().position(|&t| t == 6.0).unwrap();
        assert!(profile.concentration[index] > profile.concentration[index - 1]);
    }

    #[test]
    fn one_run_per_dose() {
        let counter = RunCounter::new();
        let simulator = Simulator::builtin().with_observer(counter.clone());
        simulator
            .solve_regimen(
                "2-compartment-oral",
                &params! {},
                &Regimen::new(50.0, 4, 8.0),
                &SolverOptions::default(),
            )
            .unwrap();
        assert_eq!(counter.count(), 4);
    }

    #[test]
    fn single_dose_ignores_interval_and_keeps_window() {
        let windows = [
            SolverOptions::default(),
            SolverOptions::new(0.0, 10.0, 0.5, Method::Rk4),
            SolverOptions::new(2.0, 8.0, 0.25, Method::Euler),
        ];
        for id in ["1-compartment-iv", "1-compartment-oral", "2-compartment-transit", "tmdd"] {
            for options in &windows {
                let single = solve_model(id, &params! {}, 100.0, options).unwrap();
                for interval in [0.0, 6.0, 24.0, 100.0] {
                    let regimen = solve_regimen(
                        id,
                        &params! {},
                        &Regimen::new(100.0, 1, interval),
                        options,
                    )
                    .unwrap();
                    assert_eq!(single, regimen, "{} interval {}", id, interval);
                }
            }
        }
    }

    #[test]
    fn single_oral_dose_keeps_zero_at_start() {
        let profile = solve_regimen(
            "1-compartment-oral",
            &params! {},
            &Regimen::new(100.0, 1, 24.0),
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(profile.len(), 241);
        assert_eq!(profile.time[0], 0.0);
        assert_eq!(profile.concentration[0], 0.0);
    }

    #[test]
    fn zero_concentrations_are_dropped() {
        let profile = solve_regimen(
            "1-compartment-oral",
            &params! {},
            &Regimen::new(100.0, 2, 12.0),
            &SolverOptions::default(),
        )
        .unwrap();
        // The oral profile starts at zero, which cannot be plotted
        assert_relative_eq!(profile.time[0], 0.1, epsilon = 1e-12);
        assert!(profile.concentration.iter().all(|&c| c > 0.0));
    }

    #[test]
    fn invalid_regimens_are_rejected() {
        for regimen in [
            Regimen::new(100.0, 0, 12.0),
            Regimen::new(f64::NAN, 2, 12.0),
            Regimen::new(100.0, 2, -1.0),
            Regimen::new(100.0, 2, f64::INFINITY),
        ] {
            let result = solve_regimen(
                "1-compartment-iv",
                &params! {},
                &regimen,
                &SolverOptions::default(),
            );
            assert!(matches!(result, Err(PkError::InvalidRegimen(_))));
        }
    }

    #[test]
    fn unknown_model_in_regimen() {
        let result = solve_regimen(
            "nope",
            &params! {},
            &Regimen::single(100.0),
            &SolverOptions::default(),
        );
        assert!(matches!(result, Err(PkError::UnknownModel(_))));
    }

    #[test]
    fn patient_regimen_from_json() {
        let patient: PatientDoseRegimen = serde_json::from_str(
            r#"{"dose": 250, "numberOfDoses": 3, "frequency": 8, "modelParameters": {"CL": 1.5}}"#,
        )
        .unwrap();
        assert_eq!(patient.regimen, Regimen::new(250.0, 3, 8.0));
        assert_eq!(patient.parameters.get("CL"), Some(1.5));

        let regimen =
            Regimen::from_json(r#"{"doseAmount": 100, "numberOfDoses": 2, "interDoseInterval": 12}"#)
                .unwrap();
        assert_eq!(regimen, Regimen::new(100.0, 2, 12.0));
        let no_doses = r#"{"doseAmount": 100, "numberOfDoses": 0, "interDoseInterval": 12}"#;
        assert!(matches!(
            Regimen::from_json(no_doses),
            Err(PkError::InvalidRegimen(_))
        ));
    }
}
