use std::io::{Read, Seek};

use scroll::{Pread, LE};

use pesym_common::Arch;

use super::raw::*;
use super::{PeError, PeErrorKind};
use crate::reader::ByteReader;

/// Maps a COFF `Machine` value to an [`Arch`].
///
/// Machine types other than the four supported ones map to [`Arch::Unknown`].
pub fn arch_from_machine(machine: u16) -> Arch {
    match machine {
        IMAGE_FILE_MACHINE_I386 => Arch::X86,
        IMAGE_FILE_MACHINE_AMD64 => Arch::X64,
        IMAGE_FILE_MACHINE_ARMNT => Arch::Arm32,
        IMAGE_FILE_MACHINE_ARM64 => Arch::Arm64,
        _ => Arch::Unknown,
    }
}

/// The validated headers of a PE image.
///
/// This combines the DOS header, the COFF file header and the bitness of the optional header into
/// the offsets required to locate the section table and the data directories.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PeHeader {
    /// File offset of the `PE\0\0` signature, taken from `e_lfanew`.
    pub pe_header_offset: u32,
    /// Whether the optional header is `IMAGE_OPTIONAL_HEADER64`.
    pub is_64: bool,
    /// The CPU architecture derived from the COFF machine type.
    pub arch: Arch,
    /// The raw COFF machine type.
    pub machine: u16,
    /// Number of entries in the section table.
    pub number_of_sections: u16,
    /// Link time in seconds since the Unix epoch.
    pub time_date_stamp: u32,
    /// File offset of the first section header.
    pub section_table_offset: u64,
}

impl PeHeader {
    /// Validates the DOS and COFF headers at the start of the reader.
    ///
    /// Fails with [`PeErrorKind::InvalidDosHeader`] if the data does not start with `MZ`, and with
    /// [`PeErrorKind::InvalidPeHeader`] if the PE signature is missing. Unknown machine types are not
    /// an error, but an unrecognized optional header magic is.
    pub fn parse<R: Read + Seek>(reader: &mut ByteReader<R>) -> Result<Self, PeError> {
        // Check the signature before the size, so that short non-PE inputs are reported as such.
        let dos_len = reader.len().min(DOS_HEADER_SIZE as u64) as usize;
        let dos_header = reader.read_at(dos_len, 0)?;
        if dos_header.pread_with::<u16>(0, LE).ok() != Some(IMAGE_DOS_SIGNATURE) {
            return Err(PeErrorKind::InvalidDosHeader.into());
        }
        if dos_header.len() < DOS_HEADER_SIZE {
            return Err(PeError::new(
                PeErrorKind::TruncatedRead,
                "file is too small for a DOS header",
            ));
        }

        let pe_header_offset: u32 = dos_header.pread_with(DOS_HEADER_LFANEW_OFFSET, LE)?;
        tracing::trace!(pe_header_offset, "found PE header offset");

        let nt_headers = reader.read_at(NT_HEADERS_COMMON_SIZE, pe_header_offset.into())?;
        if !nt_headers.starts_with(IMAGE_NT_SIGNATURE) {
            return Err(PeErrorKind::InvalidPeHeader.into());
        }

        let machine: u16 = nt_headers.pread_with(NT_HEADERS_MACHINE_OFFSET, LE)?;
        let number_of_sections = nt_headers.pread_with(NT_HEADERS_NUMBER_OF_SECTIONS_OFFSET, LE)?;
        let time_date_stamp = nt_headers.pread_with(NT_HEADERS_TIME_DATE_STAMP_OFFSET, LE)?;
        let magic: u16 = nt_headers.pread_with(NT_HEADERS_MAGIC_OFFSET, LE)?;

        let (is_64, nt_headers_size) = match magic {
            IMAGE_NT_OPTIONAL_HDR32_MAGIC => (false, IMAGE_NT_HEADERS32_SIZE),
            IMAGE_NT_OPTIONAL_HDR64_MAGIC => (true, IMAGE_NT_HEADERS64_SIZE),
            _ => {
                return Err(PeError::new(
                    PeErrorKind::UnsupportedOptionalHeaderMagic,
                    format!("optional header magic {magic:#x}"),
                ))
            }
        };

        Ok(PeHeader {
            pe_header_offset,
            is_64,
            arch: arch_from_machine(machine),
            machine,
            number_of_sections,
            time_date_stamp,
            section_table_offset: u64::from(pe_header_offset) + nt_headers_size,
        })
    }

    /// File offset of the data directory entry with the given index.
    ///
    /// The data directories are the last 16 entries of the optional header, so their position only
    /// depends on the bitness of the image.
    pub fn data_directory_offset(&self, index: usize) -> u64 {
        let array_offset = if self.is_64 {
            IMAGE_DATA_DIRECTORY64_OFFSET
        } else {
            IMAGE_DATA_DIRECTORY32_OFFSET
        };

        u64::from(self.pe_header_offset)
            + array_offset
            + (index * IMAGE_DATA_DIRECTORY_SIZE) as u64
    }
}
