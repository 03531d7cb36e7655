//! Synthetic PE32+ images for tests.
//!
//! Images are laid out in page-aligned memory from [`region::alloc`] with `ImageBase` set to wherever they landed,
//! so they look to the engine exactly like a module mapped by a loader.

use std::ops::Range;
use std::slice;

use region::{Allocation, Protection};

/// Offset of the NT headers (`e_lfanew`)
const NT_OFFSET: usize = 0x80;
/// Size of the PE32+ optional header including 16 data directories
const OPTIONAL_HEADER_SIZE: usize = 0xf0;
/// Size of one section header
const SECTION_HEADER_SIZE: usize = 40;

/// Section to be written into the header
struct SectionSpec {
    /// Name, at most 8 bytes
    name: &'static str,
    /// RVA of the section
    virtual_address: u32,
    /// Mapped size of the section
    virtual_size: u32,
    /// `IMAGE_SCN_*` flags
    characteristics: u32,
}

/// Builder for [`SyntheticImage`]
pub(crate) struct SyntheticImageBuilder {
    /// Total mapped size
    size: usize,
    /// `AddressOfEntryPoint`
    entry_point: u32,
    /// `BaseOfCode`
    base_of_code: u32,
    /// Section table
    sections: Vec<SectionSpec>,
}
impl SyntheticImageBuilder {
    /// Sets `AddressOfEntryPoint`
    pub(crate) fn entry_point(mut self, rva: u32) -> Self {
        self.entry_point = rva;
        self
    }

    /// Sets `BaseOfCode`
    pub(crate) fn base_of_code(mut self, rva: u32) -> Self {
        self.base_of_code = rva;
        self
    }

    /// Appends a section header
    pub(crate) fn section(
        mut self,
        name: &'static str,
        virtual_address: u32,
        virtual_size: u32,
        characteristics: u32,
    ) -> Self {
        assert!(name.len() <= 8, "section names are at most 8 bytes");
        self.sections.push(SectionSpec {
            name,
            virtual_address,
            virtual_size,
            characteristics,
        });
        self
    }

    /// Allocates the image and writes its headers
    pub(crate) fn build(self) -> SyntheticImage {
        let allocation = region::alloc(self.size, Protection::READ_WRITE).unwrap();
        let mut image = SyntheticImage { allocation };
        let base = image.base() as u64;
        let size = image.len() as u32;
        let bytes = image.bytes_mut();

        // DOS header
        bytes[0..2].copy_from_slice(b"MZ");
        put_u32(bytes, 0x3c, NT_OFFSET as u32);

        // NT signature and file header
        bytes[NT_OFFSET..NT_OFFSET + 4].copy_from_slice(b"PE\0\0");
        let file = NT_OFFSET + 4;
        put_u16(bytes, file, 0x8664);
        put_u16(bytes, file + 2, self.sections.len() as u16);
        put_u16(bytes, file + 16, OPTIONAL_HEADER_SIZE as u16);
        put_u16(bytes, file + 18, 0x0022);

        // Optional header
        let optional = file + 20;
        put_u16(bytes, optional, 0x20b);
        put_u32(bytes, optional + 16, self.entry_point);
        put_u32(bytes, optional + 20, self.base_of_code);
        put_u64(bytes, optional + 24, base);
        put_u32(bytes, optional + 32, 0x1000);
        put_u32(bytes, optional + 36, 0x200);
        put_u32(bytes, optional + 56, size);
        put_u32(bytes, optional + 60, 0x400);
        put_u32(bytes, optional + 108, 16);

        // Section table
        let table = optional + OPTIONAL_HEADER_SIZE;
        for (i, section) in self.sections.iter().enumerate() {
            let header = table + i * SECTION_HEADER_SIZE;
            bytes[header..header + section.name.len()].copy_from_slice(section.name.as_bytes());
            put_u32(bytes, header + 8, section.virtual_size);
            put_u32(bytes, header + 12, section.virtual_address);
            put_u32(bytes, header + 16, section.virtual_size);
            put_u32(bytes, header + 20, section.virtual_address);
            put_u32(bytes, header + 36, section.characteristics);
        }

        image
    }
}

/// A fake module image living in its own pages
pub(crate) struct SyntheticImage {
    /// Backing pages, unmapped on drop
    allocation: Allocation,
}
impl SyntheticImage {
    /// Builder with a 0x6000 byte image, entry point and base of code at 0x1000, and no sections
    pub(crate) fn builder() -> SyntheticImageBuilder {
        SyntheticImageBuilder {
            size: 0x6000,
            entry_point: 0x1000,
            base_of_code: 0x1000,
            sections: Vec::new(),
        }
    }

    /// Address of the first byte of the image
    pub(crate) fn base(&self) -> usize {
        self.allocation.as_ptr::<u8>() as usize
    }

    /// Mapped size of the image
    pub(crate) fn len(&self) -> usize {
        self.allocation.len()
    }

    /// Offset of the NT headers
    pub(crate) fn nt_offset(&self) -> usize {
        NT_OFFSET
    }

    /// The whole image
    pub(crate) fn bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.allocation.as_ptr::<u8>(), self.len()) }
    }

    /// The whole image, mutably. Only valid while every page is writable.
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        unsafe { slice::from_raw_parts_mut(self.allocation.as_mut_ptr::<u8>(), len) }
    }

    /// Copies `data` into the image at `rva`
    pub(crate) fn write(&mut self, rva: usize, data: &[u8]) {
        self.bytes_mut()[rva..rva + data.len()].copy_from_slice(data);
    }

    /// Changes the protection of the pages covering `rvas`
    pub(crate) fn protect(&self, rvas: Range<usize>, protection: Protection) {
        unsafe {
            region::protect(
                (self.base() + rvas.start) as *const u8,
                rvas.end - rvas.start,
                protection,
            )
            .unwrap()
        };
    }

    /// Current protection of the page holding `rva`
    pub(crate) fn protection_at(&self, rva: usize) -> Protection {
        region::query((self.base() + rva) as *const u8)
            .unwrap()
            .protection()
    }
}

/// Writes a little-endian `u16`
fn put_u16(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Writes a little-endian `u32`
fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Writes a little-endian `u64`
fn put_u64(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
