use std::io::{Read, Seek};

use scroll::{Pread, LE};

use super::raw::*;
use super::{PeError, PeHeader};
use crate::reader::ByteReader;

/// An entry of the section table, reduced to the fields needed for address translation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SectionHeader {
    /// The section name, up to the first NUL byte.
    pub name: String,
    /// Size of the section when loaded into memory.
    pub virtual_size: u32,
    /// Address of the first byte of the section relative to the image base.
    pub virtual_address: u32,
    /// File offset of the first byte of the section.
    pub pointer_to_raw_data: u32,
}

impl SectionHeader {
    /// Decodes a single 40-byte section header.
    pub fn parse(data: &[u8]) -> Result<Self, PeError> {
        let name_bytes = data.get(..IMAGE_SIZEOF_SHORT_NAME).unwrap_or(data);
        let name_len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_bytes.len());

        Ok(SectionHeader {
            name: String::from_utf8_lossy(&name_bytes[..name_len]).into_owned(),
            virtual_size: data.pread_with(IMAGE_SECTION_HEADER_VIRTUAL_SIZE_OFFSET, LE)?,
            virtual_address: data.pread_with(IMAGE_SECTION_HEADER_VIRTUAL_ADDRESS_OFFSET, LE)?,
            pointer_to_raw_data: data
                .pread_with(IMAGE_SECTION_HEADER_POINTER_TO_RAW_DATA_OFFSET, LE)?,
        })
    }

    /// Returns `true` if the relative virtual address lies within this section.
    pub fn contains(&self, rva: u32) -> bool {
        let start = u64::from(self.virtual_address);
        let end = start + u64::from(self.virtual_size);
        (start..end).contains(&u64::from(rva))
    }
}

/// The section table of a PE image.
///
/// Sections are kept in table order. Overlapping sections are not reconciled: lookups always resolve
/// to the first section containing an address.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SectionTable {
    sections: Vec<SectionHeader>,
}

impl SectionTable {
    /// Creates a section table from already decoded headers.
    pub fn new(sections: Vec<SectionHeader>) -> Self {
        SectionTable { sections }
    }

    /// Reads all section headers announced by the COFF header.
    pub fn read<R: Read + Seek>(
        reader: &mut ByteReader<R>,
        header: &PeHeader,
    ) -> Result<Self, PeError> {
        let count = usize::from(header.number_of_sections);
        let data = reader.read_at(
            count * IMAGE_SECTION_HEADER_SIZE,
            header.section_table_offset,
        )?;
        Self::parse(&data, count)
    }

    /// Decodes `count` consecutive section headers from a buffer.
    pub fn parse(data: &[u8], count: usize) -> Result<Self, PeError> {
        let sections = data
            .chunks(IMAGE_SECTION_HEADER_SIZE)
            .take(count)
            .map(SectionHeader::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if sections.len() < count {
            return Err(scroll::Error::TooBig {
                size: count * IMAGE_SECTION_HEADER_SIZE,
                len: data.len(),
            }
            .into());
        }

        Ok(SectionTable { sections })
    }

    /// All sections in table order.
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Returns the section with the given name, if any.
    pub fn section_by_name(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// Translates a relative virtual address to a file offset.
    ///
    /// Addresses below 4096 are returned unchanged. This range holds the image headers, and some
    /// producers store file offsets there directly. Other addresses resolve through the first section
    /// that contains them, or to `None` if there is no such section.
    pub fn rva_to_offset(&self, rva: u32) -> Option<u64> {
        if rva < RVA_PASSTHROUGH_LIMIT {
            return Some(rva.into());
        }

        let section = self.sections.iter().find(|section| section.contains(rva))?;
        Some(u64::from(section.pointer_to_raw_data) + u64::from(rva - section.virtual_address))
    }
}
