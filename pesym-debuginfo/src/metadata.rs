//! The per-file decode result.

use std::fmt;
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use pesym_common::{Arch, BuildId};

use crate::pe::{find_codeview, PeError, PeHeader, SectionTable};
use crate::reader::ByteReader;

/// The kind of file a [`PeFileMetadata`] was read from.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SourceType {
    /// A Windows executable or library.
    #[default]
    PeBinary,
    /// A Breakpad text symbol file.
    BreakpadSym,
}

/// The kind of symbol information a file can contribute.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SymbolSource {
    /// Full debug information with source file and line records.
    DebugInfo,
    /// Public symbols only.
    SymbolTable,
    /// No usable symbol information.
    #[default]
    None,
}

impl SymbolSource {
    /// Returns the name of this symbol source as used in upload events.
    pub fn name(self) -> &'static str {
        match self {
            SymbolSource::DebugInfo => "debug_info",
            SymbolSource::SymbolTable => "symbol_table",
            SymbolSource::None => "none",
        }
    }
}

impl fmt::Display for SymbolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Debug information extracted from a single file.
///
/// A record is created for every decoded file, whether or not the file turns out to be a PE image.
/// Structural problems do not fail the decode. Instead, they are stored in [`error`](Self::error)
/// so that one corrupted file never aborts a batch.
#[derive(Debug, Default)]
pub struct PeFileMetadata {
    /// The file this record was decoded from.
    pub path: PathBuf,
    /// Path of the PDB as recorded in the binary, or an empty string.
    pub filename: String,
    /// Whether the file has valid DOS and PE headers.
    pub is_pe: bool,
    /// The CPU architecture of the image.
    pub arch: Arch,
    /// Whether a CodeView PDB 7.0 record was found.
    pub has_pdb_info: bool,
    /// The PDB age, `0` without PDB information.
    pub pdb_age: u32,
    /// The formatted PDB signature, `None` without PDB information.
    pub pdb_sig: Option<String>,
    /// Link time of the image in seconds since the Unix epoch.
    pub time_date_stamp: Option<u32>,
    /// The kind of file this record was read from.
    pub source_type: SourceType,
    /// The kind of symbol information the file provides.
    pub symbol_source: SymbolSource,
    /// The operating system named in a Breakpad module header.
    pub module_os: Option<String>,
    /// The error that stopped decoding, if any.
    pub error: Option<PeError>,
}

impl PeFileMetadata {
    /// Opens and decodes the file at the given path.
    ///
    /// Only failing to open the file is returned as an error. The file handle is closed before this
    /// function returns.
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::from_path_impl(path.as_ref())
    }

    #[tracing::instrument(
        level = "debug",
        name = "PeFileMetadata::from_path",
        skip_all,
        fields(path = %path.display())
    )]
    fn from_path_impl(path: &Path) -> io::Result<Self> {
        let mut reader = ByteReader::open(path)?;
        Ok(Self::from_reader(path, &mut reader))
    }

    /// Decodes an in-memory buffer.
    ///
    /// The `path` is only used to label the result.
    pub fn from_slice<P: Into<PathBuf>>(path: P, data: &[u8]) -> Self {
        let mut reader: ByteReader<Cursor<&[u8]>> = ByteReader::from_slice(data);
        Self::from_reader(path, &mut reader)
    }

    /// Decodes an image from an open reader.
    pub fn from_reader<P, R>(path: P, reader: &mut ByteReader<R>) -> Self
    where
        P: Into<PathBuf>,
        R: Read + Seek,
    {
        let mut metadata = PeFileMetadata {
            path: path.into(),
            ..Default::default()
        };

        let header = match PeHeader::parse(reader) {
            Ok(header) => header,
            Err(error) => {
                tracing::debug!(%error, "not a PE image");
                metadata.error = Some(error);
                return metadata;
            }
        };

        metadata.is_pe = true;
        metadata.arch = header.arch;
        metadata.time_date_stamp = Some(header.time_date_stamp);

        let codeview = SectionTable::read(reader, &header)
            .and_then(|sections| find_codeview(reader, &header, &sections));

        match codeview {
            Ok(Some(record)) => {
                metadata.has_pdb_info = true;
                metadata.pdb_age = record.age;
                metadata.pdb_sig = Some(record.signature());
                metadata.symbol_source = SymbolSource::DebugInfo;
                metadata.filename = record.file_name;
            }
            Ok(None) => (),
            Err(error) => {
                tracing::debug!(%error, "failed to read debug directory");
                metadata.error = Some(error);
            }
        }

        metadata
    }

    /// The identity of the referenced PDB.
    ///
    /// This is `<pdb_sig>_<pdb_age>` for files with PDB information and `?_?` otherwise.
    pub fn build_id(&self) -> BuildId {
        match (&self.pdb_sig, self.has_pdb_info) {
            (Some(signature), true) => BuildId::new(signature, self.pdb_age),
            _ => BuildId::unknown(),
        }
    }

    /// Returns `true` if the file is a PE image that could be decoded without errors.
    pub fn is_valid_pe(&self) -> bool {
        self.is_pe && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pesym_common::Uuid;
    use pesym_testutils::{DebugRecord, PeBuilder};
    use similar_asserts::assert_eq;

    use crate::pe::raw::IMAGE_FILE_MACHINE_ARM64;
    use crate::pe::PeErrorKind;

    #[test]
    fn test_build_id() {
        let metadata = PeFileMetadata::from_slice(
            "app.exe",
            &PeBuilder::new(IMAGE_FILE_MACHINE_ARM64)
                .debug_record(DebugRecord::codeview(Uuid::from_u128(0xab), 7, "app.pdb"))
                .build(),
        );

        assert_eq!(
            metadata.build_id().as_str(),
            "00000000-0000-0000-0000-0000000000AB_7"
        );
        assert_eq!(metadata.arch, Arch::Arm64);
        assert_eq!(metadata.symbol_source, SymbolSource::DebugInfo);
    }

    #[test]
    fn test_build_id_without_pdb() {
        let metadata = PeFileMetadata::from_slice(
            "app.exe",
            &PeBuilder::new(IMAGE_FILE_MACHINE_ARM64).build(),
        );

        assert!(metadata.is_valid_pe());
        assert!(metadata.build_id().is_unknown());
        assert_eq!(metadata.symbol_source, SymbolSource::None);
    }

    #[test]
    fn test_error_after_header_keeps_is_pe() {
        let mut data = PeBuilder::new(IMAGE_FILE_MACHINE_ARM64)
            .number_of_sections(12)
            .build();
        data.truncate(0x200);

        let metadata = PeFileMetadata::from_slice("app.exe", &data);
        assert!(metadata.is_pe);
        assert!(!metadata.is_valid_pe());
        assert_eq!(
            metadata.error.as_ref().map(PeError::kind),
            Some(PeErrorKind::TruncatedRead)
        );
        assert!(metadata.build_id().is_unknown());
    }

    #[test]
    fn test_symbol_source_names() {
        assert_eq!(SymbolSource::DebugInfo.to_string(), "debug_info");
        assert_eq!(SymbolSource::SymbolTable.to_string(), "symbol_table");
        assert_eq!(SymbolSource::None.to_string(), "none");
    }
}
