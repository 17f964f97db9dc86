use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Named parameter values keyed by their catalog symbol (`CL`, `V1`, `ka`, `Vmax`, ...).
///
/// Symbols are case-sensitive: `V` (volume) and `v` are different parameters.
/// A symbol that is absent is filled with the model default; a symbol that is present is used
/// as given, including `0.0`.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    map: BTreeMap<String, f64>,
}

#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut parameters = $crate::Parameters::default();
        $(
            parameters.insert($key, $value as f64);
        )*
        parameters
    }};
}

impl Parameters {
    pub fn new(map: BTreeMap<String, f64>) -> Self {
        Self { map }
    }

    /// Get the value of a parameter, if present
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.map.get(symbol).copied()
    }

    /// Get the value of a parameter, or `default` when it is absent
    #[inline(always)]
    pub fn get_or(&self, symbol: &str, default: f64) -> f64 {
        self.get(symbol).unwrap_or(default)
    }

    pub fn insert(&mut self, symbol: impl Into<String>, value: f64) {
        self.map.insert(symbol.into(), value);
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.map.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.map.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.map.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Parse a flat JSON object of numbers, e.g. `{"CL": 2.0, "V": 10}`
    pub fn from_json(json: &str) -> Result<Self, crate::PkError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<HashMap<String, f64>> for Parameters {
    fn from(map: HashMap<String, f64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, f64>> for Parameters {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self { map }
    }
}
