//! Section descriptors and the lookup of the section holding the entry point

use std::ops::Range;

/// A section header, copied out of the mapped image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name with trailing nul padding removed
    pub name: String,
    /// RVA of the first byte of the section
    pub virtual_address: u32,
    /// Size of the section once mapped
    pub virtual_size: u32,
    /// Size of the section's data in the file
    pub raw_size: u32,
    /// Raw `IMAGE_SCN_*` flags
    pub characteristics: u32,
}
impl Section {
    /// Half-open RVA range covered by the section once mapped.
    ///
    /// Computed in `u64` so a malformed header cannot wrap the end around.
    pub fn virtual_range(&self) -> Range<u64> {
        let start = u64::from(self.virtual_address);
        start..start + u64::from(self.virtual_size)
    }

    /// Whether `rva` falls inside [`Section::virtual_range`]
    pub fn contains(&self, rva: u32) -> bool {
        self.virtual_range().contains(&u64::from(rva))
    }
}

/// Finds the first section, in header order, whose range contains `entry_point`.
///
/// Overlapping sections are not checked for; the earliest one wins.
pub fn find_entry_section(sections: &[Section], entry_point: u32) -> Option<&Section> {
    sections.iter().find(|section| section.contains(entry_point))
}
