#![cfg(feature = "breakpad")]

use pesym_common::Arch;
use pesym_debuginfo::breakpad::{read_breakpad_metadata, BreakpadErrorKind};
use pesym_debuginfo::{SourceType, SymbolSource};
use pesym_testutils::fixture;

use similar_asserts::assert_eq;

type Error = Box<dyn std::error::Error>;

#[test]
fn test_debug_info() -> Result<(), Error> {
    let path = fixture("breakpad/example.sym");
    let metadata = read_breakpad_metadata(&path)?;

    assert_eq!(metadata.path, path);
    assert!(!metadata.is_pe);
    assert!(metadata.has_pdb_info);
    assert_eq!(metadata.arch, Arch::X64);
    assert_eq!(metadata.filename, "sample.pdb");
    assert_eq!(metadata.module_os.as_deref(), Some("windows"));
    assert_eq!(metadata.source_type, SourceType::BreakpadSym);
    assert_eq!(metadata.symbol_source, SymbolSource::DebugInfo);
    assert_eq!(
        metadata.build_id().as_str(),
        "3E3A3E3A-1C05-4E67-B9B7-99D781E5FB5C_1"
    );

    Ok(())
}

#[test]
fn test_public_symbols_only() -> Result<(), Error> {
    let metadata = read_breakpad_metadata(fixture("breakpad/public_only.sym"))?;

    assert_eq!(metadata.arch, Arch::X86);
    assert_eq!(metadata.filename, "my library.pdb");
    assert_eq!(metadata.pdb_age, 10);
    assert_eq!(
        metadata.pdb_sig.as_deref(),
        Some("E37085B2-4E2C-4BF4-B83F-84F16BC71B74")
    );
    // FILE records after the first PUBLIC record are not considered
    assert_eq!(metadata.symbol_source, SymbolSource::SymbolTable);

    Ok(())
}

#[test]
fn test_missing_module_header() {
    let error = read_breakpad_metadata(fixture("breakpad/invalid_no_module.sym")).unwrap_err();
    assert_eq!(error.kind(), BreakpadErrorKind::MissingModuleHeader);
}

#[test]
fn test_non_ascii_module_header() {
    let error = read_breakpad_metadata(fixture("breakpad/invalid_non_ascii.sym")).unwrap_err();
    assert_eq!(error.kind(), BreakpadErrorKind::NotAscii);
}

#[test]
fn test_missing_file() {
    let error = read_breakpad_metadata("does/not/exist.sym").unwrap_err();
    assert_eq!(error.kind(), BreakpadErrorKind::Io);
}

#[test]
fn test_pe_binary_is_not_a_symbol_file() {
    let image = pesym_testutils::PeBuilder::new(0x8664).build();
    let error = pesym_debuginfo::breakpad::parse_breakpad_metadata("app.exe", &image[..])
        .unwrap_err();

    // the DOS header contains non-ASCII bytes
    assert_eq!(error.kind(), BreakpadErrorKind::NotAscii);
}
