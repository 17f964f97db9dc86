//! Mammillary compartment models.
//!
//! A model is described by three independent choices:
//! - [Disposition]: central compartment alone, or exchanging with one or two peripherals
//! - [Absorption]: IV bolus into the central compartment, a first-order depot, or a chain of
//!   `n` transit compartments
//! - [Elimination]: linear, Michaelis-Menten, or both, always from the central compartment
//!
//! States are ordered absorption first, then central, then peripherals. All states are amounts.

use std::sync::Arc;

use crate::simulator::models::{ModelDefinition, Resolver};
use crate::simulator::{DiffEq, OdeSystem, Parameters, V};
use crate::PkError;

/// Longest transit chain a model will build
const MAX_TRANSIT: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    OneCompartment,
    TwoCompartment,
    ThreeCompartment,
}

impl Disposition {
    fn peripherals(&self) -> usize {
        match self {
            Disposition::OneCompartment => 0,
            Disposition::TwoCompartment => 1,
            Disposition::ThreeCompartment => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorption {
    /// Dose placed directly in the central compartment
    Bolus,
    /// Dose scaled by `F` in a depot emptied at rate `ka`
    FirstOrder,
    /// Dose scaled by `F` in the first of `n` transit compartments, each passing on at `ktr`
    Transit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elimination {
    /// `CL / V * A`
    Linear,
    /// `Vmax * C / (Km + C) * V`
    MichaelisMenten,
    /// Sum of the linear and saturable terms
    Mixed,
}

/// Administration route of the combined IV/oral models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Iv,
    Oral,
}

impl From<Route> for Absorption {
    fn from(route: Route) -> Self {
        match route {
            Route::Iv => Absorption::Bolus,
            Route::Oral => Absorption::FirstOrder,
        }
    }
}

/// A compartment model definition
#[derive(Debug, Clone)]
pub struct Compartmental {
    id: String,
    disposition: Disposition,
    absorption: Absorption,
    elimination: Elimination,
    defaults: Vec<(&'static str, f64)>,
}

impl Compartmental {
    pub fn new(
        id: impl Into<String>,
        disposition: Disposition,
        absorption: Absorption,
        elimination: Elimination,
    ) -> Self {
        Self {
            id: id.into(),
            disposition,
            absorption,
            elimination,
            defaults: defaults_for(disposition, absorption, elimination),
        }
    }

    /// Linear model dosed through `route`
    pub fn combined(id: impl Into<String>, disposition: Disposition, route: Route) -> Self {
        Self::new(id, disposition, route.into(), Elimination::Linear)
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    pub fn absorption(&self) -> Absorption {
        self.absorption
    }

    pub fn elimination(&self) -> Elimination {
        self.elimination
    }
}

fn defaults_for(
    disposition: Disposition,
    absorption: Absorption,
    elimination: Elimination,
) -> Vec<(&'static str, f64)> {
    let mut defaults = Vec::new();
    match disposition {
        Disposition::OneCompartment => defaults.push(("V", 10.0)),
        Disposition::TwoCompartment => {
            defaults.extend([("V1", 5.0), ("V2", 15.0), ("Q", 1.0)]);
        }
        Disposition::ThreeCompartment => {
            defaults.extend([
                ("V1", 5.0),
                ("V2", 10.0),
                ("V3", 20.0),
                ("Q2", 1.0),
                ("Q3", 0.5),
            ]);
        }
    }
    match elimination {
        Elimination::Linear => defaults.push(("CL", 2.0)),
        Elimination::MichaelisMenten => defaults.extend([("Vmax", 50.0), ("Km", 5.0)]),
        Elimination::Mixed => defaults.extend([("CL", 1.0), ("Vmax", 50.0), ("Km", 5.0)]),
    }
    match absorption {
        Absorption::Bolus => {}
        Absorption::FirstOrder => defaults.extend([("ka", 1.0), ("F", 1.0)]),
        Absorption::Transit => defaults.extend([("ktr", 1.0), ("n", 3.0), ("F", 1.0)]),
    }
    defaults
}

#[derive(Debug, Clone, Copy)]
enum Input {
    Bolus,
    FirstOrder { ka: f64 },
    Transit { ktr: f64, n: usize },
}

impl Input {
    fn nstates(&self) -> usize {
        match self {
            Input::Bolus => 0,
            Input::FirstOrder { .. } => 1,
            Input::Transit { n, .. } => *n,
        }
    }
}

/// Rate constants captured by the derivative closure
#[derive(Debug, Clone, Copy)]
struct Kinetics {
    input: Input,
    central: usize,
    peripherals: usize,
    volume: f64,
    k10: f64,
    saturable: Option<(f64, f64)>,
    k12: f64,
    k21: f64,
    k13: f64,
    k31: f64,
}

impl Kinetics {
    #[inline(always)]
    fn rhs(&self, x: &V, dx: &mut V) {
        let c = self.central;

        let absorbed = match self.input {
            Input::Bolus => 0.0,
            Input::FirstOrder { ka } => {
                dx[0] = -ka * x[0];
                ka * x[0]
            }
            Input::Transit { ktr, n } => {
                dx[0] = -ktr * x[0];
                for i in 1..n {
                    dx[i] = ktr * x[i - 1] - ktr * x[i];
                }
                ktr * x[n - 1]
            }
        };

        let a1 = x[c];
        let mut eliminated = self.k10 * a1;
        if let Some((vmax, km)) = self.saturable {
            let conc = a1 / self.volume;
            eliminated += vmax * conc / (km + conc) * self.volume;
        }
        dx[c] = absorbed - eliminated;

        if self.peripherals >= 1 {
            dx[c] += -self.k12 * a1 + self.k21 * x[c + 1];
            dx[c + 1] = self.k12 * a1 - self.k21 * x[c + 1];
        }
        if self.peripherals >= 2 {
            dx[c] += -self.k13 * a1 + self.k31 * x[c + 2];
            dx[c + 2] = self.k13 * a1 - self.k31 * x[c + 2];
        }
    }
}

impl ModelDefinition for Compartmental {
    fn id(&self) -> &str {
        &self.id
    }

    fn parameter_defaults(&self) -> &[(&'static str, f64)] {
        &self.defaults
    }

    fn volume_symbol(&self) -> &'static str {
        match self.disposition {
            Disposition::OneCompartment => "V",
            _ => "V1",
        }
    }

    fn build_system(&self, parameters: &Parameters, dose: f64) -> Result<OdeSystem, PkError> {
        let mut p = Resolver::new(parameters, &self.defaults);

        let mut k12 = 0.0;
        let mut k21 = 0.0;
        let mut k13 = 0.0;
        let mut k31 = 0.0;
        let volume = match self.disposition {
            Disposition::OneCompartment => p.read("V"),
            Disposition::TwoCompartment => {
                let v1 = p.read("V1");
                let v2 = p.read("V2");
                let q = p.read("Q");
                k12 = p.derive("k12", q / v1);
                k21 = p.derive("k21", q / v2);
                v1
            }
            Disposition::ThreeCompartment => {
                let v1 = p.read("V1");
                let v2 = p.read("V2");
                let v3 = p.read("V3");
                let q2 = p.read("Q2");
                let q3 = p.read("Q3");
                k12 = p.derive("k12", q2 / v1);
                k21 = p.derive("k21", q2 / v2);
                k13 = p.derive("k13", q3 / v1);
                k31 = p.derive("k31", q3 / v3);
                v1
            }
        };

        let linear_symbol = match self.disposition {
            Disposition::OneCompartment => "ke",
            _ => "k10",
        };
        let (k10, saturable) = match self.elimination {
            Elimination::Linear => {
                let cl = p.read("CL");
                (p.derive(linear_symbol, cl / volume), None)
            }
            Elimination::MichaelisMenten => (0.0, Some((p.read("Vmax"), p.read("Km")))),
            Elimination::Mixed => {
                let cl = p.read("CL");
                let k10 = p.derive(linear_symbol, cl / volume);
                (k10, Some((p.read("Vmax"), p.read("Km"))))
            }
        };

        let (input, bioavailability) = match self.absorption {
            Absorption::Bolus => (Input::Bolus, 1.0),
            Absorption::FirstOrder => {
                let ka = p.read("ka");
                (Input::FirstOrder { ka }, p.read("F"))
            }
            Absorption::Transit => {
                let ktr = p.read("ktr");
                let n = p.read("n").round();
                if !(1.0..=MAX_TRANSIT).contains(&n) {
                    return Err(PkError::invalid_parameter(
                        "n",
                        parameters.get("n").unwrap_or(n),
                        format!("transit compartment count must round to 1..={}", MAX_TRANSIT),
                    ));
                }
                p.derive("n", n);
                (
                    Input::Transit {
                        ktr,
                        n: n as usize,
                    },
                    p.read("F"),
                )
            }
        };

        let central = input.nstates();
        let peripherals = self.disposition.peripherals();
        let nstates = central + 1 + peripherals;

        let mut x0 = V::zeros(nstates);
        match input {
            Input::Bolus => x0[central] = dose,
            _ => x0[0] = bioavailability * dose,
        }

        let kinetics = Kinetics {
            input,
            central,
            peripherals,
            volume,
            k10,
            saturable,
            k12,
            k21,
            k13,
            k31,
        };
        let diffeq: DiffEq = Arc::new(move |x: &V, _p: &Parameters, _t: f64, dx: &mut V| {
            kinetics.rhs(x, dx)
        });

        OdeSystem::new(diffeq, x0, p.finish(), nstates)?.with_central(central)
    }

    fn is_linear(&self) -> bool {
        self.elimination == Elimination::Linear
    }

    fn fastest_rate(&self, resolved: &Parameters) -> f64 {
        let rate = |symbol: &str| resolved.get_or(symbol, 0.0);
        let saturable = match (resolved.get("Vmax"), resolved.get("Km")) {
            (Some(vmax), Some(km)) if km > 0.0 => vmax / km,
            _ => 0.0,
        };
        let central_out = rate("ke") + rate("k10") + rate("k12") + rate("k13") + saturable;
        [central_out, rate("ka"), rate("ktr"), rate("k21"), rate("k31")]
            .into_iter()
            .fold(0.0, f64::max)
    }
}

pub(crate) fn builtin() -> Vec<Compartmental> {
    use Absorption::*;
    use Disposition::*;
    use Elimination::*;

    vec![
        Compartmental::new("1-compartment-iv", OneCompartment, Bolus, Linear),
        Compartmental::new("1-compartment-oral", OneCompartment, FirstOrder, Linear),
        Compartmental::combined("1-compartment-combined", OneCompartment, Route::Iv),
        Compartmental::new("transit-compartment", OneCompartment, Transit, Linear),
        Compartmental::new("michaelis-menten", OneCompartment, Bolus, MichaelisMenten),
        Compartmental::new("combined-elimination", OneCompartment, Bolus, Mixed),
        Compartmental::new("2-compartment", TwoCompartment, Bolus, Linear),
        Compartmental::new("2-compartment-iv", TwoCompartment, Bolus, Linear),
        Compartmental::new("2-compartment-linear", TwoCompartment, Bolus, Linear),
        Compartmental::new("2-compartment-oral", TwoCompartment, FirstOrder, Linear),
        Compartmental::combined("2-compartment-combined", TwoCompartment, Route::Iv),
        Compartmental::new("2-compartment-transit", TwoCompartment, Transit, Linear),
        Compartmental::new("2-compartment-mm", TwoCompartment, Bolus, MichaelisMenten),
        Compartmental::new("2-compartment-combined-elim", TwoCompartment, Bolus, Mixed),
        Compartmental::new("3-compartment", ThreeCompartment, Bolus, Linear),
        Compartmental::new("3-compartment-iv", ThreeCompartment, Bolus, Linear),
        Compartmental::new("3-compartment-linear", ThreeCompartment, Bolus, Linear),
        Compartmental::new("3-compartment-oral", ThreeCompartment, FirstOrder, Linear),
        Compartmental::combined("3-compartment-combined", ThreeCompartment, Route::Iv),
        Compartmental::new("3-compartment-transit", ThreeCompartment, Transit, Linear),
        Compartmental::new("3-compartment-mm", ThreeCompartment, Bolus, MichaelisMenten),
        Compartmental::new("3-compartment-combined-elim", ThreeCompartment, Bolus, Mixed),
    ]
}
