#![no_main]
use libfuzzer_sys::fuzz_target;

use pesym_debuginfo::{pe, reader::ByteReader, PeFileMetadata};

fuzz_target!(|data: &[u8]| {
    let metadata = PeFileMetadata::from_slice("fuzz.exe", data);
    let _ = metadata.build_id();

    if metadata.is_pe {
        assert!(metadata.error.as_ref().map_or(true, |e| !e.is_not_pe()));
    }

    // every address must translate without panicking
    let mut reader = ByteReader::from_slice(data);
    if let Ok(header) = pe::PeHeader::parse(&mut reader) {
        if let Ok(sections) = pe::SectionTable::read(&mut reader, &header) {
            for section in sections.sections() {
                let _ = sections.rva_to_offset(section.virtual_address);
                let _ = sections.rva_to_offset(section.virtual_address.wrapping_add(section.virtual_size));
            }
        }
    }
});
