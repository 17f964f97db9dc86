//! Target-mediated drug disposition.
//!
//! Free drug `L` binds reversibly to free target `R`, forming the complex `P` which is
//! internalized. Target is synthesized at `ksyn = kdeg * R0`, so the target pool starts at its
//! steady state. Unlike the compartment models, `L`, `R` and `P` are concentrations; the
//! reported concentration is still the central state divided by `V`, as for every model.

use std::sync::Arc;

use crate::simulator::models::{ModelDefinition, Resolver};
use crate::simulator::{DiffEq, OdeSystem, Parameters, V};
use crate::PkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmddVariant {
    /// Dose enters `L` directly as `dose / V`
    Iv,
    /// Dose scaled by `F` in a depot absorbed at `ka` into `L`
    Oral,
    /// IV dosing with an additional saturable clearance of free drug
    MichaelisMenten,
}

/// A TMDD model definition
#[derive(Debug, Clone)]
pub struct Tmdd {
    id: String,
    variant: TmddVariant,
    defaults: Vec<(&'static str, f64)>,
}

impl Tmdd {
    pub fn new(id: impl Into<String>, variant: TmddVariant) -> Self {
        let mut defaults = vec![
            ("kel", 0.1),
            ("V", 5.0),
            ("kon", 0.1),
            ("koff", 0.01),
            ("kint", 0.1),
            ("R0", 1.0),
            ("kdeg", 0.01),
        ];
        match variant {
            TmddVariant::Iv => {}
            TmddVariant::Oral => defaults.extend([("ka", 0.5), ("F", 0.8)]),
            TmddVariant::MichaelisMenten => defaults.extend([("Vmax", 10.0), ("Km", 1.0)]),
        }
        Self {
            id: id.into(),
            variant,
            defaults,
        }
    }

    pub fn variant(&self) -> TmddVariant {
        self.variant
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    kel: f64,
    kon: f64,
    koff: f64,
    kint: f64,
    kdeg: f64,
    ksyn: f64,
}

impl Binding {
    /// Derivatives of `(L, R, P)`, without any input or extra elimination of `L`
    #[inline(always)]
    fn rates(&self, l: f64, r: f64, p: f64) -> (f64, f64, f64) {
        let bound = self.kon * l * r - self.koff * p;
        (
            -self.kel * l - bound,
            self.ksyn - self.kdeg * r - bound,
            bound - self.kint * p,
        )
    }
}

impl ModelDefinition for Tmdd {
    fn id(&self) -> &str {
        &self.id
    }

    fn parameter_defaults(&self) -> &[(&'static str, f64)] {
        &self.defaults
    }

    fn volume_symbol(&self) -> &'static str {
        "V"
    }

    fn build_system(&self, parameters: &Parameters, dose: f64) -> Result<OdeSystem, PkError> {
        let mut p = Resolver::new(parameters, &self.defaults);

        let kel = p.read("kel");
        let v = p.read("V");
        let kon = p.read("kon");
        let koff = p.read("koff");
        let kint = p.read("kint");
        let r0 = p.read("R0");
        let kdeg = p.read("kdeg");
        let ksyn = p.derive("ksyn", kdeg * r0);
        let binding = Binding {
            kel,
            kon,
            koff,
            kint,
            kdeg,
            ksyn,
        };

        let (diffeq, x0): (DiffEq, Vec<f64>) = match self.variant {
            TmddVariant::Iv => {
                let diffeq: DiffEq =
                    Arc::new(move |x: &V, _p: &Parameters, _t: f64, dx: &mut V| {
                        let (dl, dr, dp) = binding.rates(x[0], x[1], x[2]);
                        dx[0] = dl;
                        dx[1] = dr;
                        dx[2] = dp;
                    });
                (diffeq, vec![dose / v, r0, 0.0])
            }
            TmddVariant::Oral => {
                let ka = p.read("ka");
                let f = p.read("F");
                let diffeq: DiffEq =
                    Arc::new(move |x: &V, _p: &Parameters, _t: f64, dx: &mut V| {
                        let (dl, dr, dp) = binding.rates(x[1], x[2], x[3]);
                        dx[0] = -ka * x[0];
                        dx[1] = ka * x[0] / v + dl;
                        dx[2] = dr;
                        dx[3] = dp;
                    });
                (diffeq, vec![f * dose, 0.0, r0, 0.0])
            }
            TmddVariant::MichaelisMenten => {
                let vmax = p.read("Vmax");
                let km = p.read("Km");
                let diffeq: DiffEq =
                    Arc::new(move |x: &V, _p: &Parameters, _t: f64, dx: &mut V| {
                        let (dl, dr, dp) = binding.rates(x[0], x[1], x[2]);
                        dx[0] = dl - vmax * x[0] / (km + x[0]);
                        dx[1] = dr;
                        dx[2] = dp;
                    });
                (diffeq, vec![dose / v, r0, 0.0])
            }
        };

        let nstates = x0.len();
        let central = match self.variant {
            TmddVariant::Oral => 1,
            _ => 0,
        };
        OdeSystem::new(diffeq, V::from_vec(x0), p.finish(), nstates)?.with_central(central)
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn fastest_rate(&self, resolved: &Parameters) -> f64 {
        let rate = |symbol: &str| resolved.get_or(symbol, 0.0);
        let saturable = match (resolved.get("Vmax"), resolved.get("Km")) {
            (Some(vmax), Some(km)) if km > 0.0 => vmax / km,
            _ => 0.0,
        };
        let free_drug = rate("kel") + rate("kon") * rate("R0") + saturable;
        [free_drug, rate("koff") + rate("kint"), rate("kdeg"), rate("ka")]
            .into_iter()
            .fold(0.0, f64::max)
    }
}

pub(crate) fn builtin() -> Vec<Tmdd> {
    vec![
        Tmdd::new("tmdd", TmddVariant::Iv),
        Tmdd::new("tmdd-oral", TmddVariant::Oral),
        Tmdd::new("tmdd-mm", TmddVariant::MichaelisMenten),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;
    use approx::assert_relative_eq;

    #[test]
    fn target_starts_at_steady_state() {
        let model = Tmdd::new("tmdd", TmddVariant::Iv);
        let system = model.build_system(&params! {}, 0.0).unwrap();
        let dx = system.derivative(0.0, system.initial_state());
        assert_relative_eq!(dx[1], 0.0, epsilon = 1e-15);
        assert_relative_eq!(system.parameters().get("ksyn").unwrap(), 0.01);
    }

    #[test]
    fn binding_kinetics() {
        let model = Tmdd::new("tmdd", TmddVariant::Iv);
        let system = model
            .build_system(&params! { "V" => 5.0, "R0" => 2.0 }, 100.0)
            .unwrap();
        assert_eq!(system.initial_state().as_slice(), &[20.0, 2.0, 0.0]);

        let x = V::from_vec(vec![20.0, 2.0, 1.0]);
        let dx = system.derivative(0.0, &x);
        let bound = 0.1 * 20.0 * 2.0 - 0.01 * 1.0;
        assert_relative_eq!(dx[0], -0.1 * 20.0 - bound);
        assert_relative_eq!(dx[1], 0.01 * 2.0 - 0.01 * 2.0 - bound);
        assert_relative_eq!(dx[2], bound - 0.1 * 1.0);
    }

    #[test]
    fn oral_variant_feeds_free_drug() {
        let model = Tmdd::new("tmdd-oral", TmddVariant::Oral);
        let system = model.build_system(&params! {}, 100.0).unwrap();
        assert_eq!(system.central(), 1);
        assert_eq!(system.initial_state().as_slice(), &[80.0, 0.0, 1.0, 0.0]);
        let dx = system.derivative(0.0, system.initial_state());
        assert_relative_eq!(dx[0], -40.0);
        assert_relative_eq!(dx[1], 0.5 * 80.0 / 5.0);
    }

    #[test]
    fn saturable_term_on_free_drug() {
        let iv = Tmdd::new("tmdd", TmddVariant::Iv)
            .build_system(&params! {}, 100.0)
            .unwrap();
        let mm = Tmdd::new("tmdd-mm", TmddVariant::MichaelisMenten)
            .build_system(&params! {}, 100.0)
            .unwrap();
        let x = V::from_vec(vec![20.0, 1.0, 0.0]);
        let difference = iv.derivative(0.0, &x)[0] - mm.derivative(0.0, &x)[0];
        assert_relative_eq!(difference, 10.0 * 20.0 / 21.0, epsilon = 1e-12);
    }

    #[test]
    fn concentration_divides_by_volume() {
        let model = Tmdd::new("tmdd", TmddVariant::Iv);
        assert_eq!(model.central_volume(&params! {}), 5.0);
        assert_eq!(model.concentration(20.0, &params! {}), 4.0);
        assert_eq!(model.concentration(20.0, &params! { "V" => 2.0 }), 10.0);
        assert!(!model.is_linear());
    }
}
