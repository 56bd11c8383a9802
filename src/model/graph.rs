//! Explicit computation-graph context: seed, scopes and the parameter registry.

use indexmap::IndexMap;
use ndarray::Array2;
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::error::ConfigError;

const INIT_SCALE: f32 = 0.1;

/// Handle to a parameter matrix owned by a [`GraphContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub shape: [usize; 2],
}

/// Dropout keep probability: fixed at test time, overridable while training
/// so that dev evaluation can feed 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeepProb {
    Fixed { value: f64 },
    Overridable { default: f64 },
}

impl KeepProb {
    pub fn value(&self, feed: Option<f64>) -> f64 {
        match *self {
            Self::Fixed { value } => value,
            Self::Overridable { default } => feed.unwrap_or(default),
        }
    }
}

/// Owns every parameter created while assembling one model.
#[derive(Debug)]
pub struct GraphContext {
    seed: u64,
    rng: StdRng,
    scopes: Vec<String>,
    variables: IndexMap<String, Array2<f32>>,
}

impl GraphContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            scopes: Vec::new(),
            variables: IndexMap::new(),
        }
    }

    /// Drop all parameters and reseed.
    pub fn reset(&mut self, seed: u64) {
        debug!(seed, dropped = self.variables.len(), "resetting graph");
        *self = Self::new(seed);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Run `f` with `name` pushed onto the scope stack.
    pub fn scoped<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(name.to_string());
        let out = f(self);
        self.scopes.pop();
        out
    }

    fn qualified(&self, name: &str) -> String {
        self.scopes
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join("/")
    }

    fn register(&mut self, name: String, value: Array2<f32>) -> Result<Variable, ConfigError> {
        if self.variables.contains_key(&name) {
            return Err(ConfigError::DuplicateVariable(name));
        }
        let (rows, cols) = value.dim();
        self.variables.insert(name.clone(), value);
        Ok(Variable {
            name,
            shape: [rows, cols],
        })
    }

    /// New uniformly initialised parameter in the current scope.
    pub fn variable(&mut self, name: &str, shape: [usize; 2]) -> Result<Variable, ConfigError> {
        let dist = Uniform::new_inclusive(-INIT_SCALE, INIT_SCALE);
        let rng = &mut self.rng;
        let value = Array2::from_shape_simple_fn((shape[0], shape[1]), || rng.sample(dist));
        let name = self.qualified(name);
        self.register(name, value)
    }

    /// New parameter in the current scope initialised from `init`.
    pub fn variable_from(
        &mut self,
        name: &str,
        shape: [usize; 2],
        init: &Array2<f32>,
    ) -> Result<Variable, ConfigError> {
        let name = self.qualified(name);
        let (rows, cols) = init.dim();
        if [rows, cols] != shape {
            return Err(ConfigError::PretrainedShape {
                name,
                expected: shape,
                found: [rows, cols],
            });
        }
        self.register(name, init.clone())
    }

    pub fn get(&self, variable: &Variable) -> Option<&Array2<f32>> {
        self.variables.get(&variable.name)
    }

    pub fn get_mut(&mut self, variable: &Variable) -> Option<&mut Array2<f32>> {
        self.variables.get_mut(&variable.name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn num_parameters(&self) -> usize {
        self.variables.values().map(Array2::len).sum()
    }

    /// Keep probability for this build: 1.0 when testing, `1 - dropout` otherwise.
    pub fn keep_prob(&self, test: bool, dropout: f64) -> KeepProb {
        if test {
            KeepProb::Fixed { value: 1.0 }
        } else {
            KeepProb::Overridable {
                default: 1.0 - dropout,
            }
        }
    }
}
