#[path = "../src/backup.rs"]
mod backup;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn sample_entries() -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    entries.insert(
        "classes".to_string(),
        r#"[{"id":"c1","name":"7B","students":[]}]"#.to_string(),
    );
    entries.insert("groupHistory-c1".to_string(), "[]".to_string());
    entries
}

#[test]
fn zip_export_and_import_roundtrip() {
    let out_dir = temp_dir("rosterd-bundle-out");
    let bundle_path = out_dir.join("nested").join("workspace.zip");
    let entries = sample_entries();

    let export = backup::export_store_bundle(&entries, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 2);
    assert_eq!(export.sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains(&export.sha256));
    archive
        .by_name("store/entries.json")
        .expect("entries in bundle");

    let import = backup::import_store_bundle(&bundle_path).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.entries, entries);

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_or_foreign_bundles_are_rejected() {
    let out_dir = temp_dir("rosterd-bundle-bad");

    let plain = out_dir.join("plain.zip");
    std::fs::write(&plain, b"definitely not a zip").expect("write plain file");
    assert!(backup::import_store_bundle(&plain).is_err());

    let tampered = out_dir.join("tampered.zip");
    {
        let mut zip = zip::ZipWriter::new(File::create(&tampered).expect("create bundle"));
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("start manifest");
        zip.write_all(
            format!(
                r#"{{"format":"{}","version":1,"sha256":"{}"}}"#,
                backup::BUNDLE_FORMAT_V1,
                "0".repeat(64)
            )
            .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("store/entries.json", opts).expect("start entries");
        zip.write_all(br#"{"classes":"[]"}"#).expect("write entries");
        zip.finish().expect("finish zip");
    }
    let err = backup::import_store_bundle(&tampered).expect_err("checksum mismatch");
    assert!(format!("{err:#}").contains("checksum mismatch"));

    let foreign = out_dir.join("foreign.zip");
    {
        let mut zip = zip::ZipWriter::new(File::create(&foreign).expect("create bundle"));
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("start manifest");
        zip.write_all(br#"{"format":"someone-else-v9"}"#)
            .expect("write manifest");
        zip.finish().expect("finish zip");
    }
    let err = backup::import_store_bundle(&foreign).expect_err("unsupported format");
    assert!(format!("{err:#}").contains("unsupported bundle format"));

    let _ = std::fs::remove_dir_all(out_dir);
}
