//! This module contains a byte patcher

use std::convert::Infallible;
use std::ptr;

use super::{Patched, Patcher};

/// Patcher for patching memory locations with byte arrays.
/// This patcher never fails, and never touches memory protection; see [`super::mem::PermissionWrapper`] for that.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytePatcher;
impl BytePatcher {
    /// Creates a new [`BytePatcher`]
    pub fn new() -> Self {
        Self::default()
    }
}
unsafe impl Patcher for BytePatcher {
    type Error = Infallible;

    unsafe fn patch(&self, location: *mut u8, patch: &[u8]) -> Result<Patched, Self::Error> {
        let mut original = Vec::with_capacity(patch.len());

        // Safety: caller must pass in a `location` pointer that is valid for the full length of the patch
        ptr::copy(location, original.as_mut_ptr(), patch.len());

        // Safety: We initialized the vec to patch.len(), so fix the length
        original.set_len(patch.len());

        // Safety: caller must ensure that `location` is writable
        ptr::copy(patch.as_ptr(), location, patch.len());

        Ok(Patched::new(location as usize, original))
    }
}
