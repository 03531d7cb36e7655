//! # Patcher
//!
//! This module covers patchers, which overwrite a location in memory with a byte sequence.
//!
//! Patches are permanent for the life of the process. The bytes they overwrite are handed back in [`Patched`]
//! so a caller can put them back by hand, but nothing here does so automatically.

pub mod byte;
pub mod mem;

/// Overwrites memory with a patch
///
/// # Safety
///
/// Patchers are inherently unsafe. The implementor must ensure that the implementation of `patch` writes exactly `patch.len()` bytes at `target` and nothing else
pub unsafe trait Patcher {
    /// Error type that can occur when patching. If patching always succeeds, use [`std::convert::Infallible`].
    type Error;

    /// Patches a given location.
    ///
    /// # Safety
    ///
    /// This function is intended to be used on arbitrary memory addresses, but must be valid for the supplied patcher.
    /// `target` must be valid for reads of `patch.len()` bytes.
    unsafe fn patch(&self, target: *mut u8, patch: &[u8]) -> Result<Patched, Self::Error>;
}

unsafe impl<P: Patcher + ?Sized> Patcher for &P {
    type Error = P::Error;

    unsafe fn patch(&self, target: *mut u8, patch: &[u8]) -> Result<Patched, Self::Error> {
        (**self).patch(target, patch)
    }
}

/// Record of a write made by a [`Patcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    /// Address of the first patched byte
    location: usize,
    /// Bytes that were at `location` before the patch
    original: Vec<u8>,
}
impl Patched {
    /// Creates a record for a patch at `location` that replaced `original`
    pub fn new(location: usize, original: Vec<u8>) -> Self {
        Self { location, original }
    }

    /// Address of the first patched byte
    pub fn location(&self) -> usize {
        self.location
    }

    /// Bytes that were overwritten
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Number of bytes patched
    pub fn len(&self) -> usize {
        self.original.len()
    }

    /// Whether nothing was patched
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}
