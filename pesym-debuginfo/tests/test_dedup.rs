use pesym_common::Uuid;
use pesym_debuginfo::pe::raw::IMAGE_FILE_MACHINE_AMD64;
use pesym_debuginfo::{remove_build_id_duplicates, PeFileMetadata};
use pesym_testutils::{DebugRecord, PeBuilder};

use similar_asserts::assert_eq;

fn decode(path: &str, pdb: Option<(u128, u32, &str)>) -> PeFileMetadata {
    let mut builder = PeBuilder::new(IMAGE_FILE_MACHINE_AMD64);
    if let Some((guid, age, pdb_path)) = pdb {
        builder = builder.debug_record(DebugRecord::codeview(Uuid::from_u128(guid), age, pdb_path));
    }
    PeFileMetadata::from_slice(path, &builder.build())
}

fn summary(files: &[PeFileMetadata]) -> Vec<String> {
    files
        .iter()
        .map(|file| format!("{} {}", file.path.display(), file.build_id()))
        .collect()
}

#[test]
fn test_duplicate_pair_and_debugless_file() {
    let files = vec![
        decode("x64/app.dll", Some((0xaaaa, 1, "C:\\out\\app.pdb"))),
        decode("x64/copy/app.dll", Some((0xaaaa, 1, "C:\\out\\app.pdb"))),
        decode("x64/resources.dll", None),
    ];

    let result = remove_build_id_duplicates(files);

    insta::assert_debug_snapshot!(summary(&result.files), @r###"
    [
        "x64/resources.dll ?_?",
        "x64/app.dll 00000000-0000-0000-0000-00000000AAAA_1",
    ]
    "###);

    assert_eq!(result.duplicates.len(), 1);
    let duplicate = &result.duplicates[0];
    assert_eq!(duplicate.kept.to_str(), Some("x64/app.dll"));
    assert_eq!(duplicate.dropped.to_str(), Some("x64/copy/app.dll"));
}

#[test]
fn test_kept_set_does_not_depend_on_order() {
    let make = || {
        vec![
            decode("a.dll", Some((1, 1, "a.pdb"))),
            decode("b.dll", Some((2, 1, "b.pdb"))),
            decode("c.dll", Some((3, 1, "c.pdb"))),
            decode("d.dll", None),
        ]
    };

    let forward = remove_build_id_duplicates(make());
    let backward = remove_build_id_duplicates(make().into_iter().rev());

    assert_eq!(summary(&forward.files), summary(&backward.files));
    assert!(forward.duplicates.is_empty());
}

#[test]
fn test_survivor_depends_on_order() {
    let forward = remove_build_id_duplicates([
        decode("release/app.dll", Some((7, 2, "app.pdb"))),
        decode("staging/app.dll", Some((7, 2, "app.pdb"))),
    ]);
    let backward = remove_build_id_duplicates([
        decode("staging/app.dll", Some((7, 2, "app.pdb"))),
        decode("release/app.dll", Some((7, 2, "app.pdb"))),
    ]);

    assert_eq!(summary(&forward.files), ["release/app.dll 00000000-0000-0000-0000-000000000007_2"]);
    assert_eq!(summary(&backward.files), ["staging/app.dll 00000000-0000-0000-0000-000000000007_2"]);
}

#[test]
fn test_many_debugless_files() {
    let files = (0..5).map(|i| decode(&format!("{i}.dll"), None));
    let result = remove_build_id_duplicates(files);

    assert_eq!(result.files.len(), 5);
    assert!(result.duplicates.is_empty());
}
