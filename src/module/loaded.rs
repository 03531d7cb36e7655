//! This module contains a resolver for modules loaded by the Windows loader

use windows::core::PCWSTR;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;

use super::{ModuleResolver, ResolveError};

/// Resolver that queries the loaded-module table of the current process.
///
/// `GetModuleHandleW` only looks modules up and never loads them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadedModules;
impl LoadedModules {
    /// Creates a new [`LoadedModules`]
    pub fn new() -> Self {
        Self
    }
}

unsafe impl ModuleResolver for LoadedModules {
    fn resolve(&self, name: &str) -> Result<usize, ResolveError> {
        let wide: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();

        // Safety: `wide` is nul-terminated and outlives the call
        // A null handle comes back as an error, so any `Ok` is a loaded module
        unsafe { GetModuleHandleW(PCWSTR::from_raw(wide.as_ptr())) }
            .map(|handle| handle.0 as usize)
            .map_err(|_| ResolveError::ModuleNotFound(name.to_string()))
    }
}
