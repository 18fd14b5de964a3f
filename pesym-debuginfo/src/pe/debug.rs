use std::io::{Read, Seek};

use scroll::{Pread, LE};

use pesym_common::{DebugId, Uuid};

use super::raw::*;
use super::{PeError, PeHeader, SectionTable};
use crate::reader::ByteReader;

/// An `IMAGE_DATA_DIRECTORY` entry of the optional header.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DataDirectory {
    /// Relative virtual address of the table, or `0` if the image has no such table.
    pub virtual_address: u32,
    /// Size of the table in bytes.
    pub size: u32,
}

impl DataDirectory {
    /// Decodes a data directory entry from an 8-byte buffer.
    pub fn parse(data: &[u8]) -> Result<Self, PeError> {
        Ok(DataDirectory {
            virtual_address: data.pread_with(IMAGE_DATA_DIRECTORY_VIRTUAL_ADDRESS_OFFSET, LE)?,
            size: data.pread_with(IMAGE_DATA_DIRECTORY_SIZE_OFFSET, LE)?,
        })
    }

    /// Reads the data directory entry with the given index.
    pub fn read<R: Read + Seek>(
        reader: &mut ByteReader<R>,
        header: &PeHeader,
        index: usize,
    ) -> Result<Self, PeError> {
        let offset = header.data_directory_offset(index);
        tracing::trace!(offset, index, "reading data directory");
        Self::parse(&reader.read_at(IMAGE_DATA_DIRECTORY_SIZE, offset)?)
    }

    /// Returns `true` if the directory is absent.
    pub fn is_empty(&self) -> bool {
        self.virtual_address == 0
    }
}

/// An `IMAGE_DEBUG_DIRECTORY` record.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DebugDirectoryEntry {
    /// The format of the debug information, see `IMAGE_DEBUG_TYPE_*`.
    pub kind: u32,
    /// Size of the debug payload in bytes.
    pub size_of_data: u32,
    /// Relative virtual address of the debug payload.
    pub address_of_raw_data: u32,
    /// File offset of the debug payload.
    pub pointer_to_raw_data: u32,
}

impl DebugDirectoryEntry {
    /// Decodes a single 28-byte debug directory record.
    pub fn parse(data: &[u8]) -> Result<Self, PeError> {
        Ok(DebugDirectoryEntry {
            kind: data.pread_with(IMAGE_DEBUG_DIRECTORY_TYPE_OFFSET, LE)?,
            size_of_data: data.pread_with(IMAGE_DEBUG_DIRECTORY_SIZE_OF_DATA_OFFSET, LE)?,
            address_of_raw_data: data
                .pread_with(IMAGE_DEBUG_DIRECTORY_ADDRESS_OF_RAW_DATA_OFFSET, LE)?,
            pointer_to_raw_data: data
                .pread_with(IMAGE_DEBUG_DIRECTORY_POINTER_TO_RAW_DATA_OFFSET, LE)?,
        })
    }

    /// Returns `true` if this record points to CodeView data.
    pub fn is_codeview(&self) -> bool {
        self.kind == IMAGE_DEBUG_TYPE_CODEVIEW
    }
}

/// Decodes all complete records of a debug directory.
///
/// Trailing bytes that do not form a full 28-byte record are ignored.
pub fn parse_debug_directory(data: &[u8]) -> Result<Vec<DebugDirectoryEntry>, PeError> {
    data.chunks_exact(IMAGE_DEBUG_DIRECTORY_SIZE)
        .map(DebugDirectoryEntry::parse)
        .collect()
}

/// Converts the GUID of a `CV_INFO_PDB70` record into a [`Uuid`].
///
/// PDB70 stores the first three GUID fields in little endian and the remaining eight bytes as-is.
/// The returned UUID is in network byte order, which is how PDB tooling prints the signature.
pub fn guid_from_pdb70(mut data: [u8; 16]) -> Uuid {
    data[0..4].reverse(); // uuid field 1
    data[4..6].reverse(); // uuid field 2
    data[6..8].reverse(); // uuid field 3
    Uuid::from_bytes(data)
}

/// Formats a GUID as upper case hyphenated hex, for example
/// `E37085B2-4E2C-4BF4-B83F-84F16BC71B74`.
pub fn format_guid(guid: &Uuid) -> String {
    format!("{:X}", guid.hyphenated())
}

/// A CodeView `CV_INFO_PDB70` record, identifying the PDB of an image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodeViewPdb70 {
    /// The PDB signature.
    pub guid: Uuid,
    /// The PDB age, incremented every time the PDB is updated.
    pub age: u32,
    /// Path of the PDB as recorded by the linker.
    pub file_name: String,
}

impl CodeViewPdb70 {
    /// Decodes a CodeView payload.
    ///
    /// Returns `Ok(None)` if the payload is not in the `RSDS` format. Older CodeView formats such as
    /// `NB10` exist but do not carry a GUID.
    pub fn parse(data: &[u8]) -> Result<Option<Self>, PeError> {
        let signature: u32 = data.pread_with(CV_INFO_SIGNATURE_OFFSET, LE)?;
        if signature != CV_SIGNATURE_RSDS {
            tracing::debug!(signature, "unsupported CodeView format");
            return Ok(None);
        }

        let guid: [u8; CV_INFO_GUID_SIZE] = data
            .pread_with::<&[u8]>(CV_INFO_GUID_OFFSET, CV_INFO_GUID_SIZE)?
            .try_into()
            .map_err(|_| scroll::Error::BadOffset(CV_INFO_GUID_OFFSET))?;
        let age = data.pread_with(CV_INFO_AGE_OFFSET, LE)?;

        let name = data.get(CV_INFO_PDB_FILE_NAME_OFFSET..).unwrap_or_default();
        let name_len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        let file_name = String::from_utf8_lossy(&name[..name_len]).into_owned();

        Ok(Some(CodeViewPdb70 {
            guid: guid_from_pdb70(guid),
            age,
            file_name,
        }))
    }

    /// The canonical signature string of the PDB.
    pub fn signature(&self) -> String {
        format_guid(&self.guid)
    }

    /// The debug identifier combining signature and age.
    pub fn debug_id(&self) -> DebugId {
        DebugId::from_parts(self.guid, self.age)
    }
}

/// Locates the first CodeView record of an image and decodes it.
///
/// Returns `Ok(None)` if the image has no debug directory, no CodeView record, a CodeView record in
/// an unsupported format, or if one of the involved addresses cannot be mapped to the file. Only the
/// first CodeView record is considered.
pub fn find_codeview<R: Read + Seek>(
    reader: &mut ByteReader<R>,
    header: &PeHeader,
    sections: &SectionTable,
) -> Result<Option<CodeViewPdb70>, PeError> {
    let directory = DataDirectory::read(reader, header, IMAGE_DIRECTORY_ENTRY_DEBUG)?;
    if directory.is_empty() {
        tracing::debug!("image has no debug directory");
        return Ok(None);
    }

    let Some(offset) = sections.rva_to_offset(directory.virtual_address) else {
        tracing::debug!(
            rva = directory.virtual_address,
            "debug directory is not mapped to the file"
        );
        return Ok(None);
    };

    let data = reader.read_at(directory.size as usize, offset)?;
    let entries = parse_debug_directory(&data)?;
    tracing::trace!(offset, count = entries.len(), "read debug directory");

    let Some(entry) = entries.iter().find(|entry| entry.is_codeview()) else {
        tracing::debug!("debug directory has no CodeView record");
        return Ok(None);
    };

    let Some(offset) = sections.rva_to_offset(entry.address_of_raw_data) else {
        tracing::debug!(
            rva = entry.address_of_raw_data,
            "CodeView record is not mapped to the file"
        );
        return Ok(None);
    };

    let data = reader.read_at(entry.size_of_data as usize, offset)?;
    CodeViewPdb70::parse(&data)
}
