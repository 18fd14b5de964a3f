//! Test helpers for `pesym`.
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use scroll::{ctx::TryIntoCtx, Endian, Pwrite, LE};
use uuid::Uuid;

/// Returns the full path to the specified fixture.
///
/// Fixtures are stored in the `pesym-testutils/fixtures` directory and paths should be given
/// relative to that location.
///
/// # Example
///
/// ```
/// use pesym_testutils::fixture;
///
/// let path = fixture("breakpad/example.sym");
/// assert!(path.ends_with("breakpad/example.sym"));
/// ```
pub fn fixture<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut full_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    full_path.push("fixtures");

    let path = path.as_ref();
    full_path.push(path);

    assert!(
        full_path.exists(),
        "Fixture does not exist: {}",
        full_path.display()
    );

    full_path
}

/// File offset of the PE header in images written by [`PeBuilder`].
pub const PE_HEADER_OFFSET: usize = 0x80;
/// Relative virtual address of the `.rdata` section in images written by [`PeBuilder`].
pub const RDATA_VIRTUAL_ADDRESS: u32 = 0x2000;
/// Virtual size of the `.rdata` section in images written by [`PeBuilder`].
pub const RDATA_VIRTUAL_SIZE: u32 = 0x1000;
/// File offset of the `.rdata` section in images written by [`PeBuilder`].
pub const RDATA_POINTER_TO_RAW_DATA: usize = 0x400;

const DEBUG_DIRECTORY_SIZE: usize = 28;

fn put<T>(data: &mut [u8], offset: usize, value: T)
where
    T: TryIntoCtx<Endian, Error = scroll::Error>,
{
    data.pwrite_with(value, offset, LE)
        .expect("field out of bounds");
}

/// A debug directory record written by [`PeBuilder`].
#[derive(Clone, Debug)]
pub struct DebugRecord {
    kind: u32,
    payload: Vec<u8>,
    address: Option<u32>,
}

impl DebugRecord {
    /// A CodeView record in `RSDS` format.
    ///
    /// The GUID is given in canonical form and written in the mixed-endian layout of PDB 7.0.
    pub fn codeview(guid: Uuid, age: u32, pdb_path: &str) -> Self {
        let mut payload = b"RSDS".to_vec();
        payload.extend(guid.to_bytes_le());
        payload.extend(age.to_le_bytes());
        payload.extend(pdb_path.as_bytes());
        payload.push(0);

        Self::raw(2, payload)
    }

    /// A record of an arbitrary debug type with the given payload.
    pub fn raw(kind: u32, payload: Vec<u8>) -> Self {
        DebugRecord {
            kind,
            payload,
            address: None,
        }
    }

    /// Overrides the relative virtual address stored for the payload.
    ///
    /// The payload is still written to the file, but the record points elsewhere.
    pub fn at_address(mut self, rva: u32) -> Self {
        self.address = Some(rva);
        self
    }
}

/// Writes minimal PE images for tests.
///
/// Images consist of the DOS header, the NT headers with empty data directories except for debug,
/// and a single `.rdata` section. The debug directory and all record payloads are placed at the
/// start of `.rdata`, in the order they were added. Without debug records, the debug data
/// directory is left empty.
///
/// ```
/// use pesym_testutils::{DebugRecord, PeBuilder};
/// use uuid::Uuid;
///
/// let image = PeBuilder::new(0x8664)
///     .debug_record(DebugRecord::codeview(Uuid::nil(), 1, "app.pdb"))
///     .build();
/// assert_eq!(&image[..2], b"MZ");
/// ```
#[derive(Clone, Debug)]
pub struct PeBuilder {
    machine: u16,
    magic: u16,
    number_of_sections: u16,
    time_date_stamp: u32,
    records: Vec<DebugRecord>,
}

impl PeBuilder {
    /// Starts a 64-bit image for the given COFF machine type.
    pub fn new(machine: u16) -> Self {
        PeBuilder {
            machine,
            magic: 0x20b,
            number_of_sections: 1,
            time_date_stamp: 0,
            records: Vec::new(),
        }
    }

    /// Switches to the 32-bit optional header layout.
    pub fn pe32(self) -> Self {
        self.magic(0x10b)
    }

    /// Sets the optional header magic.
    ///
    /// Values other than `0x10b` are written using the 64-bit layout.
    pub fn magic(mut self, magic: u16) -> Self {
        self.magic = magic;
        self
    }

    /// Overrides the section count in the COFF header.
    ///
    /// Only one section header is written. Additional entries read as zeros, as long as they fit
    /// before the section data.
    pub fn number_of_sections(mut self, count: u16) -> Self {
        self.number_of_sections = count;
        self
    }

    /// Sets the link time stamp.
    pub fn time_date_stamp(mut self, time_date_stamp: u32) -> Self {
        self.time_date_stamp = time_date_stamp;
        self
    }

    /// Appends a record to the debug directory.
    pub fn debug_record(mut self, record: DebugRecord) -> Self {
        self.records.push(record);
        self
    }

    /// File offset of the payload of the record at the given index.
    pub fn payload_offset(&self, index: usize) -> usize {
        let directory_end = RDATA_POINTER_TO_RAW_DATA + self.records.len() * DEBUG_DIRECTORY_SIZE;
        directory_end
            + self.records[..index]
                .iter()
                .map(|record| record.payload.len())
                .sum::<usize>()
    }

    /// Writes the image.
    pub fn build(&self) -> Vec<u8> {
        let nt_headers_size = if self.magic == 0x10b { 248 } else { 264 };
        let data_directories = PE_HEADER_OFFSET + nt_headers_size - 16 * 8;
        let section_table = PE_HEADER_OFFSET + nt_headers_size;

        let mut data = vec![0u8; RDATA_POINTER_TO_RAW_DATA];

        // IMAGE_DOS_HEADER
        data[..2].copy_from_slice(b"MZ");
        put(&mut data, 0x3c, PE_HEADER_OFFSET as u32);

        // IMAGE_NT_HEADERS
        data[PE_HEADER_OFFSET..PE_HEADER_OFFSET + 4].copy_from_slice(b"PE\0\0");
        put(&mut data, PE_HEADER_OFFSET + 4, self.machine);
        put(&mut data, PE_HEADER_OFFSET + 6, self.number_of_sections);
        put(&mut data, PE_HEADER_OFFSET + 8, self.time_date_stamp);
        put(&mut data, PE_HEADER_OFFSET + 20, (nt_headers_size - 24) as u16);
        put(&mut data, PE_HEADER_OFFSET + 24, self.magic);

        // IMAGE_SECTION_HEADER
        data[section_table..section_table + 6].copy_from_slice(b".rdata");
        put(&mut data, section_table + 8, RDATA_VIRTUAL_SIZE);
        put(&mut data, section_table + 12, RDATA_VIRTUAL_ADDRESS);
        put(&mut data, section_table + 16, RDATA_VIRTUAL_SIZE);
        put(&mut data, section_table + 20, RDATA_POINTER_TO_RAW_DATA as u32);

        if self.records.is_empty() {
            return data;
        }

        let directory_size = self.records.len() * DEBUG_DIRECTORY_SIZE;
        put(&mut data, data_directories + 6 * 8, RDATA_VIRTUAL_ADDRESS);
        put(&mut data, data_directories + 6 * 8 + 4, directory_size as u32);

        data.resize(RDATA_POINTER_TO_RAW_DATA + directory_size, 0);
        for (index, record) in self.records.iter().enumerate() {
            let entry = RDATA_POINTER_TO_RAW_DATA + index * DEBUG_DIRECTORY_SIZE;
            let offset = data.len();
            let rva = RDATA_VIRTUAL_ADDRESS + (offset - RDATA_POINTER_TO_RAW_DATA) as u32;

            put(&mut data, entry + 12, record.kind);
            put(&mut data, entry + 16, record.payload.len() as u32);
            put(&mut data, entry + 20, record.address.unwrap_or(rva));
            put(&mut data, entry + 24, offset as u32);

            data.extend_from_slice(&record.payload);
        }

        data
    }
}
