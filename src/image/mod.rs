//! # Image
//!
//! This module reads the PE header of a module that is already mapped into the current process

use std::ops::Range;
use std::ptr;

use pelite::image::{IMAGE_DOS_HEADER, IMAGE_DOS_SIGNATURE, IMAGE_NT_HEADERS_SIGNATURE};
use thiserror::Error;

#[cfg(target_pointer_width = "32")]
use pelite::{
    image::{IMAGE_NT_HEADERS32 as IMAGE_NT_HEADERS, IMAGE_NT_OPTIONAL_HDR32_MAGIC as OPTIONAL_MAGIC},
    pe32::{Pe, PeView},
};
#[cfg(target_pointer_width = "64")]
use pelite::{
    image::{IMAGE_NT_HEADERS64 as IMAGE_NT_HEADERS, IMAGE_NT_OPTIONAL_HDR64_MAGIC as OPTIONAL_MAGIC},
    pe64::{Pe, PeView},
};

pub mod section;
#[cfg(test)]
pub(crate) mod synthetic;

pub use section::{find_entry_section, Section};

/// Errors when reading an image header
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// The module base was null
    #[error("module base address is null")]
    NullBase,
    /// The DOS header doesn't start with `MZ`
    #[error("missing DOS signature (found {0:#06x})")]
    DosSignature(u16),
    /// The NT headers don't start with `PE\0\0`
    #[error("missing NT signature (found {0:#010x})")]
    NtSignature(u32),
    /// `e_lfanew` points past the end of the address space
    #[error("NT headers offset {0:#x} overflows the address space")]
    NtOffset(u32),
    /// The optional header is for a different pointer width than this process
    #[error("unsupported optional header magic {0:#06x}")]
    OptionalMagic(u16),
}

/// Immutable view of a mapped image's header.
///
/// Everything is copied out of the header when parsing, so the view stays valid even if the header pages change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    /// Address the image is mapped at
    pub base: usize,
    /// `ImageBase` from the optional header
    pub preferred_base: u64,
    /// `AddressOfEntryPoint`, as an RVA
    pub entry_point: u32,
    /// `BaseOfCode`, as an RVA
    pub base_of_code: u32,
    /// `SizeOfImage`
    pub size_of_image: u32,
    /// Section headers in file order
    pub sections: Vec<Section>,
}

impl ImageView {
    /// Parses the header of the image mapped at `base`.
    ///
    /// Only the DOS, NT and optional header magics are checked.
    /// The rest of the header is trusted to describe the mapped memory.
    ///
    /// # Safety
    ///
    /// `base` must be readable for the DOS header, the NT headers it points at, and the section table that follows them.
    pub unsafe fn parse(base: usize) -> Result<Self, HeaderError> {
        if base == 0 {
            return Err(HeaderError::NullBase);
        }

        let dos = ptr::read_unaligned(base as *const IMAGE_DOS_HEADER);
        if dos.e_magic != IMAGE_DOS_SIGNATURE {
            return Err(HeaderError::DosSignature(dos.e_magic));
        }

        let nt_address = nt_headers_address(base, dos.e_lfanew)?;
        let nt = ptr::read_unaligned(nt_address as *const IMAGE_NT_HEADERS);
        if nt.Signature != IMAGE_NT_HEADERS_SIGNATURE {
            return Err(HeaderError::NtSignature(nt.Signature));
        }
        if nt.OptionalHeader.Magic != OPTIONAL_MAGIC {
            return Err(HeaderError::OptionalMagic(nt.OptionalHeader.Magic));
        }

        // Safety: the magics are in place, and the caller vouches for the rest of the header
        let view = PeView::module(base as *const u8);
        let optional = view.optional_header();
        let sections = view
            .section_headers()
            .iter()
            .map(|header| Section {
                name: String::from_utf8_lossy(header.name_bytes()).into_owned(),
                virtual_address: header.VirtualAddress,
                virtual_size: header.VirtualSize,
                raw_size: header.SizeOfRawData,
                characteristics: header.Characteristics,
            })
            .collect();

        Ok(Self {
            base,
            preferred_base: u64::from(optional.ImageBase),
            entry_point: optional.AddressOfEntryPoint,
            base_of_code: optional.BaseOfCode,
            size_of_image: optional.SizeOfImage,
            sections,
        })
    }

    /// The section holding the entry point, see [`find_entry_section`]
    pub fn entry_section(&self) -> Option<&Section> {
        find_entry_section(&self.sections, self.entry_point)
    }

    /// Absolute address range to scan for code: from `BaseOfCode` for the size of `section`.
    pub fn code_range(&self, section: &Section) -> Range<usize> {
        let start = self.base.saturating_add(self.base_of_code as usize);
        start..start.saturating_add(section.virtual_size as usize)
    }

    /// Whether the image is mapped at the base its header asks for
    pub fn at_preferred_base(&self) -> bool {
        self.preferred_base == self.base as u64
    }
}

/// Address of the NT headers for an image at `base` whose DOS header holds `e_lfanew`
fn nt_headers_address(base: usize, e_lfanew: u32) -> Result<usize, HeaderError> {
    usize::try_from(e_lfanew)
        .ok()
        .and_then(|offset| base.checked_add(offset))
        .ok_or(HeaderError::NtOffset(e_lfanew))
}
