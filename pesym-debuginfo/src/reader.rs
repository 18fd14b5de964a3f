//! Positioned reads over files and in-memory buffers.
//!
//! The [`ByteReader`] is the only I/O boundary of the PE decoder. Every structure is fetched as a
//! fixed-size range of bytes and decoded from that buffer afterwards.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::pe::{PeError, PeErrorKind};

/// A reader that fetches fixed-size byte ranges at given offsets.
///
/// Reads are either positioned absolutely, or continue where the previous read ended. A read never
/// returns fewer bytes than requested: if the source is too short, it fails with
/// [`PeErrorKind::TruncatedRead`] before anything is allocated. This matters for corrupted headers
/// that claim gigabytes of debug data.
///
/// When constructed via [`ByteReader::open`], the reader owns the file handle and closes it when
/// dropped.
#[derive(Debug)]
pub struct ByteReader<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl ByteReader<File> {
    /// Opens the file at the given path for reading.
    ///
    /// The file is opened read-only. Errors opening the file are returned as plain I/O errors, since
    /// they are not related to the contents of the file.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(ByteReader {
            inner: file,
            position: 0,
            len,
        })
    }
}

impl<'a> ByteReader<Cursor<&'a [u8]>> {
    /// Creates a reader over an in-memory buffer.
    pub fn from_slice(data: &'a [u8]) -> Self {
        ByteReader {
            inner: Cursor::new(data),
            position: 0,
            len: data.len() as u64,
        }
    }
}

impl<R> ByteReader<R>
where
    R: Read + Seek,
{
    /// Creates a reader over an arbitrary seekable source.
    ///
    /// The length of the source is determined once by seeking to its end.
    pub fn new(mut inner: R) -> Result<Self, PeError> {
        let len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| PeError::new(PeErrorKind::Io, e))?;

        Ok(ByteReader {
            inner,
            position: 0,
            len,
        })
    }

    /// The total length of the underlying source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the underlying source is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The offset at which the next sequential read starts.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads exactly `length` bytes.
    ///
    /// If `offset` is given, the read starts at that absolute offset from the start of the source.
    /// Otherwise, it continues at the current [`position`](Self::position). On success, the position
    /// is advanced to the end of the returned range.
    pub fn read(&mut self, length: usize, offset: Option<u64>) -> Result<Vec<u8>, PeError> {
        let start = offset.unwrap_or(self.position);
        let end = start
            .checked_add(length as u64)
            .filter(|&end| end <= self.len)
            .ok_or_else(|| {
                let available = self.len.saturating_sub(start);
                PeError::new(
                    PeErrorKind::TruncatedRead,
                    format!("requested {length} bytes at offset {start:#x}, {available} available"),
                )
            })?;

        tracing::trace!(offset = start, length, "reading byte range");

        let mut buffer = vec![0; length];
        self.inner
            .seek(SeekFrom::Start(start))
            .and_then(|_| self.inner.read_exact(&mut buffer))
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => PeError::new(PeErrorKind::TruncatedRead, e),
                _ => PeError::new(PeErrorKind::Io, e),
            })?;

        self.position = end;
        Ok(buffer)
    }

    /// Reads exactly `length` bytes at an absolute offset.
    pub fn read_at(&mut self, length: usize, offset: u64) -> Result<Vec<u8>, PeError> {
        self.read(length, Some(offset))
    }

    /// Reads exactly `length` bytes following the previous read.
    pub fn read_next(&mut self, length: usize) -> Result<Vec<u8>, PeError> {
        self.read(length, None)
    }
}
