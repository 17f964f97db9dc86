//! Model Registry
//!
//! Maps a model identifier to a [ModelDefinition], which turns a sparse parameter map and a dose
//! into a complete [OdeSystem]. Every parameter the caller leaves out is filled with the model's
//! default.
//!
//! # Example
//!
//! ```rust,ignore
//! use pksim::*;
//!
//! let registry = ModelRegistry::builtin();
//!
//! for id in registry.list() {
//!     println!("Available: {}", id);
//! }
//!
//! let system = registry.build_system("2-compartment-iv", &params! { "CL" => 3.0 }, 100.0)?;
//! assert_eq!(system.nstates(), 2);
//! ```

mod compartmental;
mod tmdd;

pub use compartmental::{Absorption, Compartmental, Disposition, Elimination, Route};
pub use tmdd::{Tmdd, TmddVariant};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::simulator::{OdeSystem, Parameters};
use crate::PkError;

/// A model topology that can be turned into an ODE system.
pub trait ModelDefinition: Send + Sync + fmt::Debug {
    /// Identifier under which the model is registered
    fn id(&self) -> &str;

    /// Every input parameter the model reads, with the value used when it is absent
    fn parameter_defaults(&self) -> &[(&'static str, f64)];

    /// Build the ODE system for a dose given at time zero
    fn build_system(&self, parameters: &Parameters, dose: f64) -> Result<OdeSystem, PkError>;

    /// Symbol of the central volume (`V` or `V1`)
    fn volume_symbol(&self) -> &'static str;

    /// Central volume, resolved with the same defaults as [ModelDefinition::build_system]
    fn central_volume(&self, parameters: &Parameters) -> f64 {
        let symbol = self.volume_symbol();
        parameters
            .get(symbol)
            .or_else(|| default_of(self.parameter_defaults(), symbol))
            .unwrap_or(f64::NAN)
    }

    /// Convert the central state into a concentration.
    ///
    /// Amount-based models divide by the central volume. Degenerate volumes yield non-finite
    /// values, which are passed through.
    fn concentration(&self, central: f64, parameters: &Parameters) -> f64 {
        central / self.central_volume(parameters)
    }

    /// Whether the system is linear in the dose, which makes dose superposition exact
    fn is_linear(&self) -> bool;

    /// Largest first-order rate constant of a built system, used for step-size advice
    fn fastest_rate(&self, resolved: &Parameters) -> f64;
}

pub(crate) fn default_of(defaults: &[(&'static str, f64)], symbol: &str) -> Option<f64> {
    defaults
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|&(_, value)| value)
}

/// Reads inputs against a defaults table and records every value it hands out
pub(crate) struct Resolver<'a> {
    input: &'a Parameters,
    defaults: &'a [(&'static str, f64)],
    resolved: Parameters,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(input: &'a Parameters, defaults: &'a [(&'static str, f64)]) -> Self {
        Self {
            input,
            defaults,
            resolved: Parameters::default(),
        }
    }

    /// Input value for `symbol`, or its default
    pub(crate) fn read(&mut self, symbol: &'static str) -> f64 {
        let default = default_of(self.defaults, symbol);
        debug_assert!(default.is_some(), "no default declared for '{}'", symbol);
        let value = self
            .input
            .get(symbol)
            .or(default)
            .unwrap_or(f64::NAN);
        self.resolved.insert(symbol, value);
        value
    }

    /// Record a secondary quantity
    pub(crate) fn derive(&mut self, symbol: &'static str, value: f64) -> f64 {
        self.resolved.insert(symbol, value);
        value
    }

    pub(crate) fn finish(self) -> Parameters {
        self.resolved
    }
}

/// A registry of model definitions keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn ModelDefinition>>,
}

lazy_static! {
    static ref BUILTIN: Arc<ModelRegistry> = Arc::new(ModelRegistry::builtin());
}

impl ModelRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in models
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for model in compartmental::builtin() {
            registry.register(model);
        }
        for model in tmdd::builtin() {
            registry.register(model);
        }
        registry
    }

    /// Process-wide read-only copy of [ModelRegistry::builtin]
    pub fn shared() -> Arc<ModelRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Add a model, returning the definition it replaced, if any
    pub fn register(
        &mut self,
        model: impl ModelDefinition + 'static,
    ) -> Option<Arc<dyn ModelDefinition>> {
        self.models.insert(model.id().to_string(), Arc::new(model))
    }

    /// Get a model by ID
    pub fn get(&self, id: &str) -> Option<&dyn ModelDefinition> {
        self.models.get(id).map(|m| m.as_ref())
    }

    /// Get a model by ID, failing with [PkError::UnknownModel]
    pub fn resolve(&self, id: &str) -> Result<&dyn ModelDefinition, PkError> {
        self.get(id)
            .ok_or_else(|| PkError::UnknownModel(id.to_string()))
    }

    /// Check if a model exists
    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    /// List all model IDs, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.models.keys().map(|s| s.as_str()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Build the ODE system of a registered model
    pub fn build_system(
        &self,
        id: &str,
        parameters: &Parameters,
        dose: f64,
    ) -> Result<OdeSystem, PkError> {
        self.resolve(id)?.build_system(parameters, dose)
    }

    /// Central volume of a registered model
    pub fn central_volume(&self, id: &str, parameters: &Parameters) -> Result<f64, PkError> {
        Ok(self.resolve(id)?.central_volume(parameters))
    }
}
