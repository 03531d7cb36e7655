//! # Engine
//!
//! Sequences module lookup, header parsing, section lookup, signature scanning and patching into a single operation.
//!
//! Every stage runs once; the first failure ends the attempt with its own [`PatchError`] and nothing is retried.

use std::convert::Infallible;

use thiserror::Error;
use tracing::debug;

use crate::definition::PatchDefinition;
use crate::image::{HeaderError, ImageView};
use crate::module::{ModuleResolver, ResolveError};
use crate::patcher::byte::BytePatcher;
use crate::patcher::mem::{PermissionError, PermissionWrapper};
use crate::patcher::{Patched, Patcher};
use crate::scanner;

/// Result code reported for a successful patch
pub const SUCCESS_CODE: i32 = 0;

/// Ways a patch attempt can fail. Each maps to a distinct, stable [`PatchError::code`].
#[derive(Debug, Error)]
pub enum PatchError {
    /// The module isn't loaded
    #[error(transparent)]
    ModuleNotFound(#[from] ResolveError),
    /// The module's image header is missing or unrecognized
    #[error("Failed to read executable image header: {0}")]
    InvalidOrMissingHeader(#[from] HeaderError),
    /// No section contains the entry point
    #[error("Failed to find text section in executable!")]
    TextSectionNotFound {
        /// The entry point RVA that nothing contained
        entry_point: u32,
    },
    /// The signature isn't in the code section
    #[error("Failed to find section of code to be patched in executable!")]
    SignatureNotFound,
    /// The patch site couldn't be made writable
    #[error("Failed to change memory protection at {location:#x}: {source}")]
    ProtectionChangeFailed {
        /// Address of the patch site
        location: usize,
        /// Error from the platform
        source: region::Error,
    },
}

impl PatchError {
    /// Stable numeric code for this failure.
    ///
    /// Success is [`SUCCESS_CODE`]; failures are negative and never reused.
    pub fn code(&self) -> i32 {
        match self {
            Self::ModuleNotFound(_) => -1,
            Self::TextSectionNotFound { .. } => -2,
            Self::SignatureNotFound => -3,
            Self::InvalidOrMissingHeader(_) => -4,
            Self::ProtectionChangeFailed { .. } => -5,
        }
    }
}

/// Converts a patcher's error into a [`PatchError`] for the site at `location`
pub trait IntoPatchError {
    /// Performs the conversion
    fn into_patch_error(self, location: usize) -> PatchError;
}
impl IntoPatchError for PermissionError<Infallible> {
    fn into_patch_error(self, location: usize) -> PatchError {
        match self {
            Self::ProtectionError(source) => PatchError::ProtectionChangeFailed { location, source },
            Self::CustomError(never) => match never {},
        }
    }
}
impl IntoPatchError for Infallible {
    fn into_patch_error(self, _location: usize) -> PatchError {
        match self {}
    }
}

/// Outcome of a successful [`PatchEngine::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPatch {
    /// Base address of the patched module
    pub module_base: usize,
    /// Name of the section that was scanned
    pub section: String,
    /// Absolute address the signature was found at
    pub signature_at: usize,
    /// The write that was made
    pub patched: Patched,
}

/// Finds a signature in a module's code and patches next to it.
///
/// Defaults to writing through a [`PermissionWrapper`] around a [`BytePatcher`].
#[derive(Debug, Clone)]
pub struct PatchEngine<R, P = PermissionWrapper<BytePatcher>> {
    /// Looks up module bases
    resolver: R,
    /// Writes the replacement
    patcher: P,
}

impl<R: ModuleResolver> PatchEngine<R> {
    /// Creates an engine that patches through page protection changes
    pub fn new(resolver: R) -> Self {
        Self::with_patcher(resolver, PermissionWrapper::new(BytePatcher::new()))
    }
}

impl<R, P> PatchEngine<R, P>
where
    R: ModuleResolver,
    P: Patcher,
    P::Error: IntoPatchError,
{
    /// Creates an engine that writes with `patcher`
    pub fn with_patcher(resolver: R, patcher: P) -> Self {
        Self { resolver, patcher }
    }

    /// Applies `definition` to the module called `module`.
    ///
    /// Memory is only written once every earlier stage has succeeded.
    /// Applying the same definition twice is not guaranteed to work: the first patch usually breaks the signature.
    ///
    /// # Safety
    ///
    /// The module's image header is trusted: its sections must describe memory that is mapped and readable.
    /// Nothing else may be reading, writing or executing the patch site while this runs.
    pub unsafe fn apply(
        &self,
        module: &str,
        definition: &PatchDefinition<'_>,
    ) -> Result<AppliedPatch, PatchError> {
        let base = self.resolver.resolve(module)?;
        debug!(module, base = format_args!("{base:#x}"), "module resolved");

        let image = ImageView::parse(base)?;
        if !image.at_preferred_base() {
            debug!(
                preferred = format_args!("{:#x}", image.preferred_base),
                "module is not at its preferred base, using the actual base"
            );
        }
        debug!(
            entry_point = format_args!("{:#x}", image.entry_point),
            sections = image.sections.len(),
            "header parsed"
        );

        let section = image
            .entry_section()
            .ok_or(PatchError::TextSectionNotFound {
                entry_point: image.entry_point,
            })?;
        let code = image.code_range(section);
        debug!(
            section = %section.name,
            start = format_args!("{:#x}", code.start),
            end = format_args!("{:#x}", code.end),
            "code section found"
        );

        let found =
            scanner::scan_range(code, definition.signature()).ok_or(PatchError::SignatureNotFound)?;
        let target = definition.target(found);
        debug!(
            signature = format_args!("{found:#x}"),
            target = format_args!("{target:#x}"),
            "signature found"
        );

        let patched = self
            .patcher
            .patch(target as *mut u8, definition.replacement())
            .map_err(|e| e.into_patch_error(target))?;
        debug!(
            location = format_args!("{target:#x}"),
            len = patched.len(),
            "patched"
        );

        Ok(AppliedPatch {
            module_base: base,
            section: section.name.clone(),
            signature_at: found,
            patched,
        })
    }
}
