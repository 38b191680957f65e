use std::path::Path;

use spritecut::Error;
use spritecut::manifest::{
    self, LabelEntry, LabelSidecar, TileRecord, apply_labels, parse_records, read_manifest,
    read_sidecar_labels, write_manifest,
};

fn record(file: &str, index: u32, label: &str) -> TileRecord {
    TileRecord {
        sheet: "hero.png".to_owned(),
        tile_index: index,
        row: index / 2,
        col: index % 2,
        file: file.to_owned(),
        label: label.to_owned(),
    }
}

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"png").unwrap();
}

// ── Tolerant parsing ──────────────────────────────────────────────────────────

#[test]
fn parses_bare_array_and_labels_object() {
    let origin = Path::new("labels.json");
    let array = r#"[{"sheet":"a.png","tile_index":0,"row":0,"col":0,"file":"a__tile_0.png","label":"idle"}]"#;
    let object = r#"{"labels":[{"index":0,"file":"a__tile_0.png","label":"idle","sheet":"a.png"}]}"#;

    let from_array = parse_records(array, origin).unwrap();
    let from_object = parse_records(object, origin).unwrap();
    assert_eq!(from_array, from_object);
    assert_eq!(from_array[0].label, "idle");
}

#[test]
fn malformed_entries_are_skipped() {
    let json = r#"[
        {"tile_index": 0, "file": "t0.png"},
        {"file": "no_index.png"},
        "not an object",
        {"tile_index": -3},
        {"tile_index": 2, "file": "t2.png", "label": "run"}
    ]"#;
    let records = parse_records(json, Path::new("m.json")).unwrap();
    let indices: Vec<u32> = records.iter().map(|r| r.tile_index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(records[0].label, "");
}

#[test]
fn unparseable_document_is_a_parse_error() {
    assert!(matches!(parse_records("{oops", Path::new("m.json")), Err(Error::Parse { .. })));
    assert!(matches!(parse_records("42", Path::new("m.json")), Err(Error::Parse { .. })));
}

#[test]
fn missing_manifest_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.json");
    assert!(matches!(read_manifest(&path), Err(Error::NotFound(p)) if p == path));
}

// ── apply_labels ──────────────────────────────────────────────────────────────

#[test]
fn apply_labels_renames_and_rewrites_manifest() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "hero__tile_0.png");
    touch(dir.path(), "hero__tile_1.png");
    touch(dir.path(), "hero__tile_2.png");
    let labels = dir.path().join("labels.json");
    write_manifest(
        &labels,
        &[
            record("hero__tile_0.png", 0, "Idle Pose"),
            record("hero__tile_1.png", 1, ""),
            record("hero__tile_2.png", 2, "  Run / Left "),
        ],
    )
    .unwrap();

    let report = apply_labels(&labels).unwrap();

    // Unlabeled tile keeps its `tile_1` name, so only two renames happen.
    assert_eq!(report.renamed, 2);
    assert!(report.missing.is_empty());
    assert!(dir.path().join("hero__idle_pose.png").is_file());
    assert!(dir.path().join("hero__tile_1.png").is_file());
    assert!(dir.path().join("hero__run_left.png").is_file());
    assert!(!dir.path().join("hero__tile_0.png").exists());

    let files: Vec<String> = read_manifest(&labels).unwrap().into_iter().map(|r| r.file).collect();
    assert_eq!(files, vec!["hero__idle_pose.png", "hero__tile_1.png", "hero__run_left.png"]);
}

#[test]
fn apply_labels_skips_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "hero__tile_0.png");
    let labels = dir.path().join("labels.json");
    write_manifest(
        &labels,
        &[record("hero__tile_0.png", 0, "jump"), record("hero__tile_1.png", 1, "fall")],
    )
    .unwrap();

    let report = apply_labels(&labels).unwrap();
    assert_eq!(report.renamed, 1);
    assert_eq!(report.missing, vec![dir.path().join("hero__tile_1.png")]);

    let records = read_manifest(&labels).unwrap();
    assert_eq!(records[0].file, "hero__jump.png");
    assert_eq!(records[1].file, "hero__tile_1.png");
}

#[test]
fn apply_labels_continues_past_failed_rename() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a__tile_0.png");
    touch(dir.path(), "a__tile_1.png");
    // A non-empty directory sits where the second tile should go.
    std::fs::create_dir(dir.path().join("a__run.png")).unwrap();
    touch(&dir.path().join("a__run.png"), "keep");
    let labels = dir.path().join("labels.json");
    write_manifest(
        &labels,
        &[record("a__tile_0.png", 0, "idle"), record("a__tile_1.png", 1, "run")],
    )
    .unwrap();

    let report = apply_labels(&labels).unwrap();
    assert_eq!(report.renamed, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, dir.path().join("a__tile_1.png"));
    assert!(matches!(report.failed[0].1, Error::Io(_)));

    // The manifest matches what is on disk.
    let files: Vec<String> = read_manifest(&labels).unwrap().into_iter().map(|r| r.file).collect();
    assert_eq!(files, vec!["a__idle.png", "a__tile_1.png"]);
    for file in &files {
        assert!(dir.path().join(file).is_file());
    }
}

#[test]
fn apply_labels_with_duplicate_labels_keeps_last_tile() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hero__tile_0.png"), b"first").unwrap();
    std::fs::write(dir.path().join("hero__tile_1.png"), b"second").unwrap();
    let labels = dir.path().join("labels.json");
    write_manifest(
        &labels,
        &[record("hero__tile_0.png", 0, "Idle"), record("hero__tile_1.png", 1, "idle")],
    )
    .unwrap();

    let report = apply_labels(&labels).unwrap();
    assert_eq!(report.renamed, 2);
    assert!(report.failed.is_empty());
    assert_eq!(std::fs::read(dir.path().join("hero__idle.png")).unwrap(), b"second");
}

#[test]
fn apply_labels_twice_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "hero__tile_0.png");
    let labels = dir.path().join("labels.json");
    write_manifest(&labels, &[record("hero__tile_0.png", 0, "idle")]).unwrap();

    apply_labels(&labels).unwrap();
    let second = apply_labels(&labels).unwrap();
    assert_eq!(second.renamed, 0);
    assert!(dir.path().join("hero__idle.png").is_file());
}

// ── Sidecars ──────────────────────────────────────────────────────────────────

#[test]
fn sidecar_round_trip_and_index_alias() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("sheet.png");
    let path = manifest::sidecar_path(&image);
    assert_eq!(path, dir.path().join("sheet.json"));

    let sidecar = LabelSidecar {
        image: image.to_string_lossy().into_owned(),
        tile_w: 32,
        tile_h: 32,
        margin: 1,
        spacing: 2,
        columns: 4,
        rows: 2,
        labels: vec![
            LabelEntry { index: 5, label: "b".to_owned() },
            LabelEntry { index: 1, label: "a".to_owned() },
        ],
    };
    manifest::write_sidecar(&path, &sidecar).unwrap();
    let loaded = read_sidecar_labels(&path).unwrap();
    assert_eq!(loaded.into_iter().collect::<Vec<_>>(), vec![
        (1, "a".to_owned()),
        (5, "b".to_owned())
    ]);

    std::fs::write(&path, r#"[{"tile_index": 3, "label": "x"}, {"index": "bad"}]"#).unwrap();
    let loaded = read_sidecar_labels(&path).unwrap();
    assert_eq!(loaded.get(&3).map(String::as_str), Some("x"));
    assert_eq!(loaded.len(), 1);
}
