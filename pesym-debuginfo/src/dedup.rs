//! Removal of files that reference the same PDB.

use std::path::PathBuf;

use indexmap::map::Entry;
use indexmap::IndexMap;

use pesym_common::BuildId;

use crate::metadata::PeFileMetadata;

/// A file that was dropped because an earlier file has the same build id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Duplicate {
    /// The shared build id.
    pub build_id: BuildId,
    /// The file that was kept.
    pub kept: PathBuf,
    /// The file that was dropped.
    pub dropped: PathBuf,
}

/// The result of [`remove_build_id_duplicates`].
#[derive(Debug, Default)]
pub struct Deduplicated {
    /// The remaining files, sorted by PDB path and then by file path.
    pub files: Vec<PeFileMetadata>,
    /// One entry per dropped file, in input order.
    pub duplicates: Vec<Duplicate>,
}

/// Removes files whose build id was already seen earlier in the batch.
///
/// The first file with a given build id wins. Files without PDB information share the `?_?` build id
/// but are never considered duplicates of each other. A warning is logged for every dropped file.
///
/// The result is sorted, so its order only depends on which files survive, not on the input order.
pub fn remove_build_id_duplicates<I>(files: I) -> Deduplicated
where
    I: IntoIterator<Item = PeFileMetadata>,
{
    let mut unique = IndexMap::new();
    let mut unknown = Vec::new();
    let mut duplicates = Vec::new();

    for file in files {
        let build_id = file.build_id();
        if build_id.is_unknown() {
            unknown.push(file);
            continue;
        }

        match unique.entry(build_id) {
            Entry::Vacant(entry) => {
                entry.insert(file);
            }
            Entry::Occupied(entry) => {
                let kept: &PeFileMetadata = entry.get();
                tracing::warn!(
                    build_id = %entry.key(),
                    kept = %kept.path.display(),
                    dropped = %file.path.display(),
                    "dropping duplicate file with the same build id"
                );
                duplicates.push(Duplicate {
                    build_id: entry.key().clone(),
                    kept: kept.path.clone(),
                    dropped: file.path,
                });
            }
        }
    }

    let mut files: Vec<_> = unique.into_values().chain(unknown).collect();
    files.sort_by(|a, b| (&a.filename, &a.path).cmp(&(&b.filename, &b.path)));

    Deduplicated { files, duplicates }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn file(path: &str, pdb: Option<(&str, u32)>) -> PeFileMetadata {
        let mut metadata = PeFileMetadata {
            path: path.into(),
            is_pe: true,
            ..Default::default()
        };

        if let Some((signature, age)) = pdb {
            metadata.has_pdb_info = true;
            metadata.pdb_sig = Some(signature.to_owned());
            metadata.pdb_age = age;
            metadata.filename = format!("{}.pdb", path.trim_end_matches(".dll"));
        }

        metadata
    }

    fn paths(files: &[PeFileMetadata]) -> Vec<&str> {
        files
            .iter()
            .filter_map(|file| file.path.to_str())
            .collect()
    }

    #[test]
    fn test_empty() {
        let result = remove_build_id_duplicates(Vec::new());
        assert!(result.files.is_empty());
        assert!(result.duplicates.is_empty());
    }

    #[test]
    fn test_age_distinguishes() {
        let result = remove_build_id_duplicates([
            file("a.dll", Some(("AAAA", 1))),
            file("b.dll", Some(("AAAA", 2))),
        ]);

        assert_eq!(paths(&result.files), ["a.dll", "b.dll"]);
        assert!(result.duplicates.is_empty());
    }

    #[test]
    fn test_first_seen_wins() {
        let result = remove_build_id_duplicates([
            file("z.dll", Some(("AAAA", 1))),
            file("a.dll", Some(("AAAA", 1))),
        ]);

        assert_eq!(paths(&result.files), ["z.dll"]);
        assert_eq!(
            result.duplicates,
            [Duplicate {
                build_id: BuildId::new("AAAA", 1),
                kept: "z.dll".into(),
                dropped: "a.dll".into(),
            }]
        );
    }

    #[test]
    fn test_files_without_pdb_coexist() {
        let result = remove_build_id_duplicates([
            file("c.dll", None),
            file("b.dll", None),
            file("a.dll", None),
        ]);

        assert_eq!(paths(&result.files), ["a.dll", "b.dll", "c.dll"]);
        assert!(result.duplicates.is_empty());
    }
}
