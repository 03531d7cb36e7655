//! This module contains a resolver backed by an explicit table of modules

use super::{ModuleResolver, ResolveError};

/// Resolver that answers from a fixed table of `(name, base)` pairs.
///
/// Names are compared ASCII case-insensitively, the same way the Windows loader compares them.
#[derive(Debug, Default, Clone)]
pub struct FixedModules {
    /// Registered modules, in insertion order
    modules: Vec<(String, usize)>,
}
impl FixedModules {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module at `base`
    ///
    /// # Safety
    ///
    /// `base` must point at a module image that stays mapped for as long as this table is used to resolve it
    pub unsafe fn with_module(mut self, name: impl Into<String>, base: usize) -> Self {
        self.modules.push((name.into(), base));
        self
    }
}

unsafe impl ModuleResolver for FixedModules {
    fn resolve(&self, name: &str) -> Result<usize, ResolveError> {
        self.modules
            .iter()
            .find(|(module, _)| module.eq_ignore_ascii_case(name))
            .map(|&(_, base)| base)
            .ok_or_else(|| ResolveError::ModuleNotFound(name.to_string()))
    }
}
