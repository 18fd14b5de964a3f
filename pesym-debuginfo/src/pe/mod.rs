//! Support for Portable Executables, an extension of COFF used on Windows.
//!
//! The decoder in this module does not parse entire images. It follows the minimal path from the
//! DOS stub to the CodeView record that links a binary to its PDB:
//!
//!  1. [`PeHeader::parse`] validates the DOS and COFF headers and determines bitness and
//!     architecture.
//!  2. [`SectionTable::read`] loads the section headers needed to translate relative virtual
//!     addresses into file offsets.
//!  3. [`find_codeview`] locates the debug data directory, walks its records and decodes the first
//!     CodeView PDB 7.0 record.
//!
//! All reads go through a [`ByteReader`](crate::reader::ByteReader), so truncated or corrupted files
//! result in a [`PeError`] instead of out-of-bounds access.

use std::error::Error;

use thiserror::Error;

mod debug;
mod header;
pub mod raw;
mod sections;

pub use self::debug::*;
pub use self::header::*;
pub use self::sections::*;

/// The kind of a [`PeError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum PeErrorKind {
    /// Fewer bytes are available than the structure being decoded claims.
    #[error("unexpected end of file")]
    TruncatedRead,

    /// The file does not start with the `MZ` DOS signature.
    #[error("invalid DOS header")]
    InvalidDosHeader,

    /// The `PE\0\0` signature is missing at the offset given by the DOS header.
    #[error("invalid PE header")]
    InvalidPeHeader,

    /// The optional header magic denotes neither a 32-bit nor a 64-bit image.
    #[error("unsupported optional header magic")]
    UnsupportedOptionalHeaderMagic,

    /// Reading from the underlying source failed.
    #[error("failed to read file")]
    Io,
}

/// An error when decoding a PE image.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct PeError {
    kind: PeErrorKind,
    #[source]
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl PeError {
    /// Creates a new PE error from a known kind of error as well as an arbitrary error payload.
    pub(crate) fn new<E>(kind: PeErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let source = Some(source.into());
        Self { kind, source }
    }

    /// Returns the corresponding [`PeErrorKind`] for this error.
    pub fn kind(&self) -> PeErrorKind {
        self.kind
    }

    /// Returns `true` if the file is not a PE image at all.
    ///
    /// This is the case when either the DOS or the PE signature is missing.
    pub fn is_not_pe(&self) -> bool {
        matches!(
            self.kind,
            PeErrorKind::InvalidDosHeader | PeErrorKind::InvalidPeHeader
        )
    }
}

impl From<PeErrorKind> for PeError {
    fn from(kind: PeErrorKind) -> Self {
        Self { kind, source: None }
    }
}

impl From<scroll::Error> for PeError {
    fn from(error: scroll::Error) -> Self {
        Self::new(PeErrorKind::TruncatedRead, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PeError::new(PeErrorKind::TruncatedRead, "8 bytes missing");
        assert_eq!(error.to_string(), "unexpected end of file");
        assert_eq!(error.source().unwrap().to_string(), "8 bytes missing");
    }

    #[test]
    fn test_not_pe() {
        assert!(PeError::from(PeErrorKind::InvalidDosHeader).is_not_pe());
        assert!(PeError::from(PeErrorKind::InvalidPeHeader).is_not_pe());
        assert!(!PeError::from(PeErrorKind::UnsupportedOptionalHeaderMagic).is_not_pe());
    }

    #[test]
    fn test_scroll_error_is_truncation() {
        use scroll::{Pread, LE};

        let error = [0u8; 2].pread_with::<u32>(0, LE).map_err(PeError::from);
        assert_eq!(error.unwrap_err().kind(), PeErrorKind::TruncatedRead);
    }
}
