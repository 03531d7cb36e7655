//! # Module
//!
//! This module covers resolvers, which map the name of a loaded module to its base address

use thiserror::Error;

pub mod fixed;
#[cfg(windows)]
pub mod loaded;

pub use fixed::FixedModules;
#[cfg(windows)]
pub use loaded::LoadedModules;

/// Errors when resolving a module
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The module is not loaded in the current process
    #[error("Failed to find {0} module!")]
    ModuleNotFound(String),
}

/// Looks up modules that are already mapped into the current process
///
/// # Safety
///
/// Everything downstream of a resolver reads memory starting at the returned address.
/// Implementors must only return addresses where a module image is mapped for the lifetime of the process,
/// and must never load a module as a side effect of a lookup.
pub unsafe trait ModuleResolver {
    /// Returns the base address of the module called `name`
    fn resolve(&self, name: &str) -> Result<usize, ResolveError>;
}

unsafe impl<R: ModuleResolver + ?Sized> ModuleResolver for &R {
    fn resolve(&self, name: &str) -> Result<usize, ResolveError> {
        (**self).resolve(name)
    }
}
