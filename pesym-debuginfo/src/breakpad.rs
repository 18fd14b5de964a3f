//! Identification of Breakpad text symbol files.
//!
//! Breakpad `.sym` files start with a `MODULE` record naming the operating system, the CPU, the
//! module identifier and the name of the original debug file:
//!
//! ```text
//! MODULE windows x86_64 3E3A3E3A1C054E67B9B799D781E5FB5C1 sample.pdb
//! ```
//!
//! For Windows modules, the identifier is the PDB signature in 32 hex digits followed by the PDB age
//! in hex. Only this header and the kind of the following records are inspected. The symbols
//! themselves are never parsed.

use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use pesym_common::{Arch, BuildId};

use crate::metadata::{PeFileMetadata, SourceType, SymbolSource};

/// Number of hex digits of the GUID part of a module identifier.
const GUID_HEX_LEN: usize = 32;

/// The kind of a [`BreakpadError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum BreakpadErrorKind {
    /// The file could not be read.
    #[error("failed to read symbol file")]
    Io,

    /// The module header contains non-ASCII characters.
    #[error("Breakpad symbol files must be ASCII encoded")]
    NotAscii,

    /// The first non-empty line is not a `MODULE` record, or the file is empty.
    #[error("missing Breakpad MODULE header")]
    MissingModuleHeader,

    /// The `MODULE` record has too few fields.
    #[error("invalid Breakpad MODULE header")]
    InvalidModuleHeader,

    /// The module identifier is not a hex GUID followed by an age.
    #[error("malformed Breakpad module identifier")]
    InvalidIdentifier,
}

/// An error when reading a Breakpad symbol file.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct BreakpadError {
    kind: BreakpadErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl BreakpadError {
    /// Creates a new Breakpad error from a known kind of error as well as an arbitrary error
    /// payload.
    fn new<E>(kind: BreakpadErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let source = Some(source.into());
        Self { kind, source }
    }

    /// Returns the corresponding [`BreakpadErrorKind`] for this error.
    pub fn kind(&self) -> BreakpadErrorKind {
        self.kind
    }
}

impl From<BreakpadErrorKind> for BreakpadError {
    fn from(kind: BreakpadErrorKind) -> Self {
        Self { kind, source: None }
    }
}

impl From<std::io::Error> for BreakpadError {
    fn from(error: std::io::Error) -> Self {
        Self::new(BreakpadErrorKind::Io, error)
    }
}

/// The `MODULE` record of a Breakpad symbol file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BreakpadModuleHeader {
    /// Name of the operating system, for example `windows`.
    pub os: String,
    /// Name of the CPU architecture, for example `x86_64`.
    pub cpu: String,
    /// The module identifier, upper cased.
    pub id: String,
    /// Name of the debug file. May contain spaces.
    pub name: String,
}

impl BreakpadModuleHeader {
    /// Parses a `MODULE` line.
    pub fn parse(line: &str) -> Result<Self, BreakpadError> {
        let mut tokens = line.split_ascii_whitespace();
        if tokens.next() != Some("MODULE") {
            return Err(BreakpadErrorKind::MissingModuleHeader.into());
        }

        let mut field = || tokens.next().ok_or(BreakpadErrorKind::InvalidModuleHeader);
        let os = field()?.to_owned();
        let cpu = field()?.to_owned();
        let id = field()?.to_ascii_uppercase();
        let first_name_part = field()?;

        let name = std::iter::once(first_name_part)
            .chain(tokens)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(BreakpadModuleHeader { os, cpu, id, name })
    }

    /// The CPU architecture of the module.
    pub fn arch(&self) -> Arch {
        self.cpu.parse().unwrap_or_default()
    }

    /// Splits the module identifier into the formatted PDB signature and the PDB age.
    pub fn pdb_identity(&self) -> Result<(String, u32), BreakpadError> {
        let id = self.id.as_str();
        if id.len() <= GUID_HEX_LEN || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BreakpadError::new(
                BreakpadErrorKind::InvalidIdentifier,
                format!("expected {GUID_HEX_LEN} hex digits and an age, found {id:?}"),
            ));
        }

        let (guid, age) = id.split_at(GUID_HEX_LEN);
        let age = u32::from_str_radix(age, 16)
            .map_err(|e| BreakpadError::new(BreakpadErrorKind::InvalidIdentifier, e))?;

        let signature = format!(
            "{}-{}-{}-{}-{}",
            &guid[0..8],
            &guid[8..12],
            &guid[12..16],
            &guid[16..20],
            &guid[20..32]
        );

        Ok((signature, age))
    }

    /// The build id of the module.
    pub fn build_id(&self) -> Result<BuildId, BreakpadError> {
        let (signature, age) = self.pdb_identity()?;
        Ok(BuildId::new(&signature, age))
    }
}

/// The information gathered from the head of a symbol file.
#[derive(Debug)]
struct BreakpadAnalysis {
    header: BreakpadModuleHeader,
    has_file_records: bool,
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

fn analyze<R: BufRead>(mut reader: R) -> Result<BreakpadAnalysis, BreakpadError> {
    let mut header = None;
    let mut has_file_records = false;
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        let trimmed = trim_ascii(&line);
        if header.is_none() {
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.is_ascii() {
                return Err(BreakpadErrorKind::NotAscii.into());
            }
            if !trimmed.starts_with(b"MODULE ") {
                return Err(BreakpadErrorKind::MissingModuleHeader.into());
            }

            let text = String::from_utf8_lossy(trimmed);
            header = Some(BreakpadModuleHeader::parse(&text)?);
            continue;
        }

        // Once functions start, no more FILE records follow.
        if trimmed.starts_with(b"FILE ") {
            has_file_records = true;
            break;
        }
        if trimmed.starts_with(b"FUNC ") || trimmed.starts_with(b"PUBLIC ") {
            break;
        }
    }

    let header = header.ok_or(BreakpadErrorKind::MissingModuleHeader)?;
    Ok(BreakpadAnalysis {
        header,
        has_file_records,
    })
}

/// Reads the metadata of a Breakpad symbol file from a buffered reader.
///
/// The `path` is only used to label the result.
pub fn parse_breakpad_metadata<P, R>(path: P, reader: R) -> Result<PeFileMetadata, BreakpadError>
where
    P: Into<PathBuf>,
    R: BufRead,
{
    let BreakpadAnalysis {
        header,
        has_file_records,
    } = analyze(reader)?;
    let (pdb_sig, pdb_age) = header.pdb_identity()?;

    let symbol_source = if has_file_records {
        SymbolSource::DebugInfo
    } else {
        SymbolSource::SymbolTable
    };

    Ok(PeFileMetadata {
        path: path.into(),
        arch: header.arch(),
        has_pdb_info: true,
        pdb_age,
        pdb_sig: Some(pdb_sig),
        source_type: SourceType::BreakpadSym,
        symbol_source,
        module_os: Some(header.os),
        filename: header.name,
        ..Default::default()
    })
}

/// Reads the metadata of the Breakpad symbol file at the given path.
///
/// The file is read only until the kind of symbol information can be determined, which usually
/// means the first few lines.
pub fn read_breakpad_metadata<P: AsRef<Path>>(path: P) -> Result<PeFileMetadata, BreakpadError> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("read_breakpad_metadata", path = %path.display()).entered();

    let file = File::open(path)?;
    parse_breakpad_metadata(path, BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    #[test]
    fn test_parse_module_header() -> Result<(), BreakpadError> {
        let header = BreakpadModuleHeader::parse(
            "MODULE windows x86_64 3e3a3e3a1c054e67b9b799d781e5fb5c1 my app.pdb",
        )?;

        assert_eq!(header.os, "windows");
        assert_eq!(header.arch(), Arch::X64);
        assert_eq!(header.id, "3E3A3E3A1C054E67B9B799D781E5FB5C1");
        assert_eq!(header.name, "my app.pdb");

        Ok(())
    }

    #[test]
    fn test_parse_module_header_too_short() {
        let error = BreakpadModuleHeader::parse("MODULE windows x86 ABCD").unwrap_err();
        assert_eq!(error.kind(), BreakpadErrorKind::InvalidModuleHeader);
    }

    #[test]
    fn test_pdb_identity() -> Result<(), BreakpadError> {
        let header =
            BreakpadModuleHeader::parse("MODULE windows arm64 3E3A3E3A1C054E67B9B799D781E5FB5C1A a")?;
        let (signature, age) = header.pdb_identity()?;

        assert_eq!(signature, "3E3A3E3A-1C05-4E67-B9B7-99D781E5FB5C");
        assert_eq!(age, 0x1a);
        assert_eq!(
            header.build_id()?.as_str(),
            "3E3A3E3A-1C05-4E67-B9B7-99D781E5FB5C_26"
        );

        Ok(())
    }

    #[test]
    fn test_pdb_identity_invalid() {
        for id in [
            // no age
            "3E3A3E3A1C054E67B9B799D781E5FB5C",
            // not hex
            "3E3A3E3A1C054E67B9B799D781E5FB5G1",
            // age overflows
            "3E3A3E3A1C054E67B9B799D781E5FB5C123456789",
        ] {
            let header = BreakpadModuleHeader::parse(&format!("MODULE windows x86 {id} a.pdb"))
                .unwrap();
            let error = header.pdb_identity().unwrap_err();
            assert_eq!(error.kind(), BreakpadErrorKind::InvalidIdentifier, "{id}");
        }
    }

    #[test]
    fn test_leading_blank_lines() -> Result<(), BreakpadError> {
        let data = b"\n  \r\nMODULE windows x86 3E3A3E3A1C054E67B9B799D781E5FB5C2 a.pdb\r\nPUBLIC 1000 0 main\n";
        let metadata = parse_breakpad_metadata("a.sym", &data[..])?;

        assert_eq!(metadata.pdb_age, 2);
        assert_eq!(metadata.filename, "a.pdb");
        assert_eq!(metadata.symbol_source, SymbolSource::SymbolTable);

        Ok(())
    }

    #[test]
    fn test_file_records_after_info() -> Result<(), BreakpadError> {
        let data = b"MODULE windows x86 3E3A3E3A1C054E67B9B799D781E5FB5C2 a.pdb\n\
                     INFO CODE_ID 5F3E2B1112000 a.dll\n\
                     FILE 0 c:\\src\\main.c\n";
        let metadata = parse_breakpad_metadata("a.sym", &data[..])?;
        assert_eq!(metadata.symbol_source, SymbolSource::DebugInfo);

        Ok(())
    }

    #[test]
    fn test_empty_file() {
        let error = parse_breakpad_metadata("a.sym", &b"\n\n"[..]).unwrap_err();
        assert_eq!(error.kind(), BreakpadErrorKind::MissingModuleHeader);
    }
}
