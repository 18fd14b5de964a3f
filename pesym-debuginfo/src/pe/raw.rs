//! Offsets, sizes and magic values of the on-disk PE structures.
//!
//! Field offsets are relative to the start of their structure. All numeric fields are stored in
//! little endian.

/// Size of `IMAGE_DOS_HEADER`.
pub const DOS_HEADER_SIZE: usize = 64;
/// `e_magic` of `IMAGE_DOS_HEADER`, the ASCII bytes `MZ`.
pub const IMAGE_DOS_SIGNATURE: u16 = 0x5A4D;
/// Offset of `e_lfanew`, the file offset of the PE header.
pub const DOS_HEADER_LFANEW_OFFSET: usize = 0x3C;

/// Signature at the start of `IMAGE_NT_HEADERS`.
pub const IMAGE_NT_SIGNATURE: &[u8; 4] = b"PE\0\0";

/// Size of the prefix shared by `IMAGE_NT_HEADERS32` and `IMAGE_NT_HEADERS64`.
///
/// This covers the signature, `IMAGE_FILE_HEADER` and the `Magic` field of the optional header.
pub const NT_HEADERS_COMMON_SIZE: usize = 26;
/// Offset of `FileHeader.Machine`.
pub const NT_HEADERS_MACHINE_OFFSET: usize = 4;
/// Offset of `FileHeader.NumberOfSections`.
pub const NT_HEADERS_NUMBER_OF_SECTIONS_OFFSET: usize = 6;
/// Offset of `FileHeader.TimeDateStamp`.
pub const NT_HEADERS_TIME_DATE_STAMP_OFFSET: usize = 8;
/// Offset of `OptionalHeader.Magic`.
pub const NT_HEADERS_MAGIC_OFFSET: usize = 24;

pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014C;
pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;
pub const IMAGE_FILE_MACHINE_ARMNT: u16 = 0x01C0;
pub const IMAGE_FILE_MACHINE_ARM64: u16 = 0xAA64;

/// Optional header magic of a 32-bit image.
pub const IMAGE_NT_OPTIONAL_HDR32_MAGIC: u16 = 0x10B;
/// Optional header magic of a 64-bit image.
pub const IMAGE_NT_OPTIONAL_HDR64_MAGIC: u16 = 0x20B;

/// Size of `IMAGE_NT_HEADERS32`, including all 16 data directories.
pub const IMAGE_NT_HEADERS32_SIZE: u64 = 248;
/// Size of `IMAGE_NT_HEADERS64`, including all 16 data directories.
pub const IMAGE_NT_HEADERS64_SIZE: u64 = 264;

/// Number of entries in the data directory array at the end of the optional header.
pub const IMAGE_NUMBEROF_DIRECTORY_ENTRIES: u64 = 16;
/// Size of `IMAGE_DATA_DIRECTORY`.
pub const IMAGE_DATA_DIRECTORY_SIZE: usize = 8;
pub const IMAGE_DATA_DIRECTORY_VIRTUAL_ADDRESS_OFFSET: usize = 0;
pub const IMAGE_DATA_DIRECTORY_SIZE_OFFSET: usize = 4;
/// Index of the debug directory in the data directory array.
pub const IMAGE_DIRECTORY_ENTRY_DEBUG: usize = 6;

/// Offset of the data directory array within `IMAGE_NT_HEADERS32`.
pub const IMAGE_DATA_DIRECTORY32_OFFSET: u64 =
    IMAGE_NT_HEADERS32_SIZE - IMAGE_NUMBEROF_DIRECTORY_ENTRIES * IMAGE_DATA_DIRECTORY_SIZE as u64;
/// Offset of the data directory array within `IMAGE_NT_HEADERS64`.
pub const IMAGE_DATA_DIRECTORY64_OFFSET: u64 =
    IMAGE_NT_HEADERS64_SIZE - IMAGE_NUMBEROF_DIRECTORY_ENTRIES * IMAGE_DATA_DIRECTORY_SIZE as u64;

/// Length of the `Name` field in a section header.
pub const IMAGE_SIZEOF_SHORT_NAME: usize = 8;
/// Size of `IMAGE_SECTION_HEADER`.
pub const IMAGE_SECTION_HEADER_SIZE: usize = 40;
pub const IMAGE_SECTION_HEADER_VIRTUAL_SIZE_OFFSET: usize = 8;
pub const IMAGE_SECTION_HEADER_VIRTUAL_ADDRESS_OFFSET: usize = 12;
pub const IMAGE_SECTION_HEADER_POINTER_TO_RAW_DATA_OFFSET: usize = 20;

/// Relative virtual addresses below this bound are used as file offsets as-is.
///
/// The first page of an image holds the headers, which are mapped at the same offset in memory and
/// on disk. Some producers also store plain file offsets in this range.
pub const RVA_PASSTHROUGH_LIMIT: u32 = 4096;

/// Size of `IMAGE_DEBUG_DIRECTORY`.
pub const IMAGE_DEBUG_DIRECTORY_SIZE: usize = 28;
pub const IMAGE_DEBUG_DIRECTORY_TYPE_OFFSET: usize = 12;
pub const IMAGE_DEBUG_DIRECTORY_SIZE_OF_DATA_OFFSET: usize = 16;
pub const IMAGE_DEBUG_DIRECTORY_ADDRESS_OF_RAW_DATA_OFFSET: usize = 20;
pub const IMAGE_DEBUG_DIRECTORY_POINTER_TO_RAW_DATA_OFFSET: usize = 24;
/// Debug directory type of CodeView records.
pub const IMAGE_DEBUG_TYPE_CODEVIEW: u32 = 2;

/// Signature of `CV_INFO_PDB70`, the ASCII bytes `RSDS`.
pub const CV_SIGNATURE_RSDS: u32 = 0x5344_5352;
pub const CV_INFO_SIGNATURE_OFFSET: usize = 0;
pub const CV_INFO_GUID_OFFSET: usize = 4;
pub const CV_INFO_GUID_SIZE: usize = 16;
pub const CV_INFO_AGE_OFFSET: usize = 20;
/// Offset of the NUL-terminated PDB path; also the size of the fixed part of `CV_INFO_PDB70`.
pub const CV_INFO_PDB_FILE_NAME_OFFSET: usize = 24;
