//! Black-box tests against the public `ops` surface only, driving a
//! freshly formatted image through the whole lifecycle a CLI user would.

use ffat::ops;
use ffat::FormatOptions;

fn formatted(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("floppy.img");
    ops::format(&path, FormatOptions::default()).unwrap();
    path
}

#[test]
fn fresh_1_44mb_image_reports_fat12_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());

    let info = ops::info(&path).unwrap();
    assert_eq!(info.fat_type, "FAT12");
    assert_eq!(info.bytes_per_sector, 512);
    assert_eq!(info.total_sectors, 2880);
    assert_eq!(info.num_fats, 2);
    assert_eq!(info.root_entry_count, 224);
    assert!(ops::list(&path, false).unwrap().is_empty());
}

#[test]
fn copy_in_list_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());

    let src = dir.path().join("notes.txt");
    std::fs::write(&src, b"a small file").unwrap();
    ops::copy_in(&path, &src, false).unwrap();

    let entries = ops::list(&path, false).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "NOTES.TXT");
    assert_eq!(entries[0].size, 12);

    ops::delete(&path, "NOTES.TXT").unwrap();
    assert!(ops::list(&path, false).unwrap().is_empty());
}

#[test]
fn file_spanning_several_clusters_round_trips_its_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("floppy2.img");
    // Larger cluster than default so this still fits a 1.44MB image
    // comfortably while still spanning multiple clusters.
    let mut options = FormatOptions::default();
    options.sectors_per_cluster = 1;
    ops::format(&path, options).unwrap();

    let src = dir.path().join("payload.bin");
    let payload = vec![0x5Au8; 512 * 5 + 3];
    std::fs::write(&src, &payload).unwrap();
    ops::copy_in(&path, &src, false).unwrap();

    let entries = ops::list(&path, false).unwrap();
    assert_eq!(entries[0].size, payload.len() as u32);
}

#[test]
fn copy_in_without_overwrite_rejects_duplicate_then_overwrite_replaces_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());

    let src = dir.path().join("dup.txt");
    std::fs::write(&src, b"v1").unwrap();
    ops::copy_in(&path, &src, false).unwrap();

    assert!(matches!(
        ops::copy_in(&path, &src, false),
        Err(ffat::FfatError::AlreadyExists)
    ));

    std::fs::write(&src, b"v2, a bit longer").unwrap();
    ops::copy_in(&path, &src, true).unwrap();

    let entries = ops::list(&path, false).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].size, b"v2, a bit longer".len() as u32);
}

#[test]
fn mkdir_then_list_shows_directory_attribute_and_dot_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());

    ops::mkdir(&path, "DOCS").unwrap();
    let entries = ops::list(&path, false).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_directory);
    assert_eq!(entries[0].size, 0);
    assert!(entries[0].first_cluster >= 2);
}

#[test]
fn mkdir_duplicate_name_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());

    ops::mkdir(&path, "DOCS").unwrap();
    assert!(matches!(
        ops::mkdir(&path, "DOCS"),
        Err(ffat::FfatError::AlreadyExists)
    ));
}

#[test]
fn root_directory_rejects_entries_past_its_fixed_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());

    let info = ops::info(&path).unwrap();
    for i in 0..info.root_entry_count {
        ops::mkdir(&path, &format!("D{i}")).unwrap();
    }
    assert!(matches!(
        ops::mkdir(&path, "OVERFLOW"),
        Err(ffat::FfatError::DirectoryFull)
    ));
}

#[test]
fn deleting_unknown_name_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = formatted(dir.path());
    assert!(matches!(
        ops::delete(&path, "GHOST.TXT"),
        Err(ffat::FfatError::NotFound)
    ));
}
