//! Runner registry: catalogue of available strategies and their factories.
//!
//! The engine runs *instances*; this registry knows the *kinds*. Each entry
//! pairs static [`RunnerMeta`] with a factory that builds a fresh runner for
//! a given instance name, so one strategy can back several configured
//! runners. `TradingEngine::load_runners` wires the two together from an
//! `EngineConfig`.
//!
//! Insertion order is preserved in `list()`.

use std::collections::BTreeMap;

use qk_model::{Param, ParamValue};

use crate::Runner;

// ---------------------------------------------------------------------------
// Factory type alias
// ---------------------------------------------------------------------------

/// Builds a fresh runner named after the configured instance.
pub type RunnerFactory = Box<dyn Fn(&str) -> Box<dyn Runner> + Send + Sync>;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct RunnerMeta {
    /// Registry key, referenced by `strategy:` in engine config.
    pub name: String,
    pub version: String,
    pub description: String,
    /// Parameters the strategy expects in `init`.
    pub params: Vec<Param>,
}

impl RunnerMeta {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Declared params absent from `values`.
    pub fn missing_params(&self, values: &BTreeMap<String, ParamValue>) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| !values.contains_key(&p.name))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Declared params present in `values` with a different kind.
    pub fn mistyped_params(&self, values: &BTreeMap<String, ParamValue>) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| values.get(&p.name).is_some_and(|v| v.kind() != p.kind))
            .map(|p| p.name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunnerRegistryError {
    DuplicateName { name: String },
    UnknownStrategy { name: String },
    EmptyName,
}

impl std::fmt::Display for RunnerRegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName { name } => {
                write!(f, "strategy '{name}' is already registered")
            }
            Self::UnknownStrategy { name } => {
                write!(f, "no strategy named '{name}' is registered")
            }
            Self::EmptyName => write!(f, "strategy name must not be empty"),
        }
    }
}

impl std::error::Error for RunnerRegistryError {}

// ---------------------------------------------------------------------------
// RunnerRegistry
// ---------------------------------------------------------------------------

struct RegistryEntry {
    meta: RunnerMeta,
    factory: RunnerFactory,
}

#[derive(Default)]
pub struct RunnerRegistry {
    entries: Vec<RegistryEntry>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, meta: RunnerMeta, factory: F) -> Result<(), RunnerRegistryError>
    where
        F: Fn(&str) -> Box<dyn Runner> + Send + Sync + 'static,
    {
        if meta.name.trim().is_empty() {
            return Err(RunnerRegistryError::EmptyName);
        }
        if self.contains(&meta.name) {
            return Err(RunnerRegistryError::DuplicateName {
                name: meta.name.clone(),
            });
        }
        self.entries.push(RegistryEntry {
            meta,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.meta.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> Vec<&RunnerMeta> {
        self.entries.iter().map(|e| &e.meta).collect()
    }

    pub fn lookup(&self, name: &str) -> Result<&RunnerMeta, RunnerRegistryError> {
        self.entry(name).map(|e| &e.meta)
    }

    /// A fresh runner of kind `strategy`, named `instance`. The factory runs
    /// on every call; instances never share state.
    pub fn instantiate(
        &self,
        strategy: &str,
        instance: &str,
    ) -> Result<Box<dyn Runner>, RunnerRegistryError> {
        self.entry(strategy).map(|e| (e.factory)(instance))
    }

    pub fn deregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.meta.name != name);
        self.entries.len() < before
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry, RunnerRegistryError> {
        self.entries
            .iter()
            .find(|e| e.meta.name == name)
            .ok_or_else(|| RunnerRegistryError::UnknownStrategy {
                name: name.to_string(),
            })
    }
}
