//! Upload events describing a file's PDB.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pesym_common::Arch;

use crate::metadata::{PeFileMetadata, SymbolSource};

/// The event type of PE debug information uploads.
pub const TYPE_PE_DEBUG_INFOS: &str = "pe_debug_infos";

/// The origin reported in upload events.
pub const ORIGIN: &str = "pesym";

/// Returns the file name component of a PDB path.
///
/// PDB paths are recorded by the linker on the build machine, so both Windows and POSIX separators
/// are accepted regardless of the host platform.
pub fn pdb_basename(pdb_path: &str) -> &str {
    pdb_path
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(pdb_path)
}

/// Returns the locations where the PDB of a binary is expected, in order of preference.
///
/// The first candidate is the recorded PDB file name in the folder of the binary. The second is
/// the binary's own name with a `.pdb` extension.
pub fn pdb_candidates(path: &Path, pdb_filename: &str) -> Vec<PathBuf> {
    let folder = path.parent().unwrap_or_else(|| Path::new(""));
    let mut candidates = Vec::with_capacity(2);

    let recorded = pdb_basename(pdb_filename);
    if !recorded.is_empty() {
        candidates.push(folder.join(recorded));
    }

    if let Some(stem) = path.file_stem() {
        let mut associated = stem.to_os_string();
        associated.push(".pdb");
        let associated = folder.join(associated);
        if !candidates.contains(&associated) {
            candidates.push(associated);
        }
    }

    candidates
}

/// Returns the first existing PDB candidate of a binary.
pub fn find_pdb(path: &Path, pdb_filename: &str) -> Option<PathBuf> {
    let found = pdb_candidates(path, pdb_filename)
        .into_iter()
        .find(|candidate| candidate.is_file());

    if found.is_none() {
        tracing::debug!(path = %path.display(), pdb_filename, "no PDB found next to binary");
    }

    found
}

/// The event sent along with every uploaded PDB.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MappingMetadata {
    /// Version of the uploading tool.
    pub cli_version: String,
    /// Version of the component that produced the event.
    pub origin_version: String,
    /// Name of the component that produced the event.
    pub origin: String,
    pub arch: Arch,
    pub pdb_age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdb_sig: Option<String>,
    pub symbol_source: SymbolSource,
    /// File name of the PDB, without folders.
    pub filename: String,
    /// Whether existing debug information with the same build id is replaced.
    pub overwrite: bool,
    /// The event type, always [`TYPE_PE_DEBUG_INFOS`].
    #[serde(rename = "type")]
    pub kind: String,
}

impl MappingMetadata {
    /// Creates the upload event for a decoded file.
    pub fn new(file: &PeFileMetadata, version: &str, overwrite: bool) -> Self {
        MappingMetadata {
            cli_version: version.to_owned(),
            origin_version: version.to_owned(),
            origin: ORIGIN.to_owned(),
            arch: file.arch,
            pdb_age: file.pdb_age,
            pdb_sig: file.pdb_sig.clone(),
            symbol_source: file.symbol_source,
            filename: pdb_basename(&file.filename).to_owned(),
            overwrite,
            kind: TYPE_PE_DEBUG_INFOS.to_owned(),
        }
    }

    /// Serializes the event into its JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Renders a one-line description of the upload of the given file.
    pub fn render_upload(&self, path: &Path) -> String {
        format!(
            "Uploading debug info for {} (arch:{} pdb_age:{} pdb_sig:{} filename:{})",
            path.display(),
            self.arch,
            self.pdb_age,
            self.pdb_sig.as_deref().unwrap_or(""),
            self.filename,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    use crate::metadata::SourceType;

    fn sample() -> PeFileMetadata {
        PeFileMetadata {
            path: "bin/app.dll".into(),
            filename: "D:\\a\\_work\\out\\app64.pdb".into(),
            is_pe: true,
            arch: Arch::X64,
            has_pdb_info: true,
            pdb_age: 1,
            pdb_sig: Some("3E3A3E3A-1C05-4E67-B9B7-99D781E5FB5C".into()),
            source_type: SourceType::PeBinary,
            symbol_source: SymbolSource::DebugInfo,
            ..Default::default()
        }
    }

    #[test]
    fn test_pdb_basename() {
        assert_eq!(pdb_basename("C:\\build\\x64\\app.pdb"), "app.pdb");
        assert_eq!(pdb_basename("/home/build/app.pdb"), "app.pdb");
        assert_eq!(pdb_basename("C:/mixed\\seps/app.pdb"), "app.pdb");
        assert_eq!(pdb_basename("app.pdb"), "app.pdb");
        assert_eq!(pdb_basename(""), "");
    }

    #[test]
    fn test_pdb_candidates() {
        let candidates = pdb_candidates(Path::new("bin/app.dll"), "D:\\out\\app64.pdb");
        assert_eq!(
            candidates,
            [PathBuf::from("bin/app64.pdb"), PathBuf::from("bin/app.pdb")]
        );

        let candidates = pdb_candidates(Path::new("bin/app.dll"), "app.pdb");
        assert_eq!(candidates, [PathBuf::from("bin/app.pdb")]);

        let candidates = pdb_candidates(Path::new("app.exe"), "");
        assert_eq!(candidates, [PathBuf::from("app.pdb")]);
    }

    #[test]
    fn test_find_pdb() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let binary = dir.path().join("app.dll");
        std::fs::write(&binary, b"MZ")?;

        assert_eq!(find_pdb(&binary, "C:\\out\\app64.pdb"), None);

        std::fs::write(dir.path().join("app.pdb"), b"")?;
        assert_eq!(
            find_pdb(&binary, "C:\\out\\app64.pdb"),
            Some(dir.path().join("app.pdb"))
        );

        std::fs::write(dir.path().join("app64.pdb"), b"")?;
        assert_eq!(
            find_pdb(&binary, "C:\\out\\app64.pdb"),
            Some(dir.path().join("app64.pdb"))
        );

        Ok(())
    }

    #[test]
    fn test_mapping_json() {
        let mapping = MappingMetadata::new(&sample(), "0.3.0", false);
        insta::assert_json_snapshot!(mapping, @r###"
        {
          "cli_version": "0.3.0",
          "origin_version": "0.3.0",
          "origin": "pesym",
          "arch": "x64",
          "pdb_age": 1,
          "pdb_sig": "3E3A3E3A-1C05-4E67-B9B7-99D781E5FB5C",
          "symbol_source": "debug_info",
          "filename": "app64.pdb",
          "overwrite": false,
          "type": "pe_debug_infos"
        }
        "###);
    }

    #[test]
    fn test_mapping_roundtrip() -> serde_json::Result<()> {
        let mapping = MappingMetadata::new(&sample(), "0.3.0", true);
        let parsed: MappingMetadata = serde_json::from_str(&mapping.to_json()?)?;
        assert_eq!(parsed, mapping);
        Ok(())
    }

    #[test]
    fn test_render_upload() {
        let mapping = MappingMetadata::new(&sample(), "0.3.0", false);
        assert_eq!(
            mapping.render_upload(Path::new("bin/app.dll")),
            "Uploading debug info for bin/app.dll (arch:x64 pdb_age:1 \
             pdb_sig:3E3A3E3A-1C05-4E67-B9B7-99D781E5FB5C filename:app64.pdb)"
        );
    }
}
