use rayon::prelude::*;

use crate::simulator::SolverOptions;
use crate::solve::{PatientDoseRegimen, Profile, Simulator};
use crate::PkError;

impl Simulator {
    /// Solve one regimen per patient in parallel.
    ///
    /// Results are returned in the order of `patients`; a failing patient does not stop the
    /// others.
    pub fn simulate_patients(
        &self,
        model_id: &str,
        patients: &[PatientDoseRegimen],
        options: &SolverOptions,
    ) -> Vec<Result<Profile, PkError>> {
        log::debug!(
            "simulating {} patients with model {}",
            patients.len(),
            model_id
        );
        patients
            .par_iter()
            .map(|patient| {
                self.solve_regimen(model_id, &patient.parameters, &patient.regimen, options)
            })
            .collect()
    }
}
