//! # Definition
//!
//! A patch definition is the signature to search for, where the edit goes relative to it, and what gets written there

use thiserror::Error;

/// Errors in a patch definition
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionError {
    /// The signature has no bytes
    #[error("signature is empty")]
    EmptySignature,
    /// The replacement has no bytes
    #[error("replacement is empty")]
    EmptyReplacement,
    /// The replacement would write past the last matched byte
    #[error("replacement at offset {offset} with length {len} overruns a {signature_len} byte signature")]
    OutOfBounds {
        /// Offset of the replacement from the signature's start
        offset: usize,
        /// Length of the replacement
        len: usize,
        /// Length of the signature
        signature_len: usize,
    },
}

/// A signature, offset and replacement triple.
///
/// The replacement always lies inside the matched signature bytes, so a patch only ever overwrites memory the scan has compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchDefinition<'a> {
    /// Bytes to search for
    signature: &'a [u8],
    /// Offset from the start of the match to the first replaced byte
    patch_offset: usize,
    /// Bytes to write at the patch site
    replacement: &'a [u8],
}

impl<'a> PatchDefinition<'a> {
    /// Creates a new definition.
    ///
    /// This is a `const fn` so compiled-in definitions are checked while compiling:
    ///
    /// ```
    /// use scanpatch::definition::PatchDefinition;
    ///
    /// const NOP_FIRST_BYTE: PatchDefinition = match PatchDefinition::new(&[0xcc, 0xc3], 0, &[0x90]) {
    ///     Ok(definition) => definition,
    ///     Err(_) => panic!("invalid patch definition"),
    /// };
    /// assert_eq!(NOP_FIRST_BYTE.replacement(), &[0x90]);
    /// ```
    pub const fn new(
        signature: &'a [u8],
        patch_offset: usize,
        replacement: &'a [u8],
    ) -> Result<Self, DefinitionError> {
        if signature.is_empty() {
            return Err(DefinitionError::EmptySignature);
        }
        if replacement.is_empty() {
            return Err(DefinitionError::EmptyReplacement);
        }
        match patch_offset.checked_add(replacement.len()) {
            Some(end) if end <= signature.len() => Ok(Self {
                signature,
                patch_offset,
                replacement,
            }),
            _ => Err(DefinitionError::OutOfBounds {
                offset: patch_offset,
                len: replacement.len(),
                signature_len: signature.len(),
            }),
        }
    }

    /// Bytes to search for
    pub const fn signature(&self) -> &'a [u8] {
        self.signature
    }

    /// Offset from the start of the match to the first replaced byte
    pub const fn patch_offset(&self) -> usize {
        self.patch_offset
    }

    /// Bytes to write at the patch site
    pub const fn replacement(&self) -> &'a [u8] {
        self.replacement
    }

    /// Absolute patch site for a signature matched at `found`
    pub fn target(&self, found: usize) -> usize {
        found + self.patch_offset
    }
}
