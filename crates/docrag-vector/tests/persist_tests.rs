use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use docrag_core::{Error, Passage};
use docrag_vector::{read_manifest, VectorIndex, MANIFEST_FILE};
use serde_json::Value;
use tempfile::TempDir;

fn sample_index() -> VectorIndex {
    VectorIndex::build(
        3,
        vec![
            Passage::new(0, "Invoice total is $500."),
            Passage::new(1, "Payment due in 30 days."),
            Passage::new(2, "Customer ID: C1042."),
        ],
        vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
    )
    .expect("build")
    .with_embedder_id("fake:xxh64:d3")
}

fn edit_manifest(dir: &Path, f: impl FnOnce(&mut Value)) {
    let path = dir.join(MANIFEST_FILE);
    let mut manifest: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    f(&mut manifest);
    fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();
}

fn assert_corrupt(dir: &Path, dim: usize) {
    match VectorIndex::load(dir, dim) {
        Err(Error::CorruptIndex { .. }) => {}
        other => panic!("expected CorruptIndex, got {other:?}"),
    }
}

#[test]
fn save_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let index = sample_index();
    index.save(tmp.path()).expect("save");

    let loaded = VectorIndex::load(tmp.path(), 3).expect("load");
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.passages(), index.passages());
    assert_eq!(loaded.embedder_id(), Some("fake:xxh64:d3"));
    let query = [0.9, 0.1, 0.0];
    assert_eq!(loaded.search(&query, 5).unwrap(), index.search(&query, 5).unwrap());
}

#[test]
fn empty_index_round_trips() {
    let tmp = TempDir::new().unwrap();
    VectorIndex::new(4).unwrap().save(tmp.path()).expect("save");
    let loaded = VectorIndex::load(tmp.path(), 4).expect("load");
    assert!(loaded.is_empty());
}

#[test]
fn missing_manifest_is_not_found() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(VectorIndex::load(tmp.path(), 3), Err(Error::NotFound(_))));
}

#[test]
fn resave_keeps_previous_blob_and_removes_older_ones() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).expect("save");
    let first = read_manifest(tmp.path()).unwrap().vectors_file;

    let mut bigger = sample_index();
    bigger.add(Passage::new(3, "Late fee applies."), &[0.5, 0.5, 0.0]).unwrap();
    bigger.save(tmp.path()).expect("save again");
    let second = read_manifest(tmp.path()).unwrap().vectors_file;
    assert_ne!(second, first);
    assert!(tmp.path().join(&first).exists());

    bigger.add(Passage::new(4, "Paid in full."), &[0.0, 0.5, 0.5]).unwrap();
    bigger.save(tmp.path()).expect("save a third time");

    let manifest = read_manifest(tmp.path()).unwrap();
    assert_eq!(manifest.count, 5);
    assert!(!tmp.path().join(&first).exists());
    assert!(tmp.path().join(&second).exists());
    assert_eq!(VectorIndex::load(tmp.path(), 3).unwrap().len(), 5);
}

/// Index whose vectors differ per `generation`, so every save writes a new blob.
fn generation_index(generation: usize) -> VectorIndex {
    let passages = (0..50).map(|i| Passage::new(i as u64, format!("passage {i}"))).collect();
    let embeddings = (0..50).map(|i| vec![generation as f32, i as f32, 1.0]).collect();
    VectorIndex::build(3, passages, embeddings).expect("build")
}

#[test]
fn loads_racing_saves_never_see_a_corrupt_index() {
    let tmp = TempDir::new().unwrap();
    generation_index(0).save(tmp.path()).expect("save");
    let done = AtomicBool::new(false);

    let loads = std::thread::scope(|s| {
        s.spawn(|| {
            for generation in 1..=300 {
                generation_index(generation).save(tmp.path()).expect("save");
            }
            done.store(true, Ordering::SeqCst);
        });
        let reader = s.spawn(|| {
            let mut loads = 0usize;
            loop {
                let finished = done.load(Ordering::SeqCst);
                let index = VectorIndex::load(tmp.path(), 3).expect("load during save");
                assert_eq!(index.len(), 50);
                let generation = index.vector(0).unwrap()[0];
                assert_eq!(index.vector(49).unwrap(), &[generation, 49.0, 1.0][..]);
                loads += 1;
                if finished {
                    break loads;
                }
            }
        });
        reader.join().unwrap()
    });
    assert!(loads > 0);
}

#[test]
fn configured_dimension_must_match() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    assert_corrupt(tmp.path(), 4);
}

#[test]
fn count_mismatch_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    edit_manifest(tmp.path(), |m| {
        m["passages"].as_array_mut().unwrap().pop();
        m["count"] = Value::from(2);
    });
    assert_corrupt(tmp.path(), 3);
}

#[test]
fn manifest_count_disagreeing_with_passages_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    edit_manifest(tmp.path(), |m| m["count"] = Value::from(5));
    assert_corrupt(tmp.path(), 3);
}

#[test]
fn tampered_blob_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    let blob = tmp.path().join(read_manifest(tmp.path()).unwrap().vectors_file);
    let mut bytes = fs::read(&blob).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    fs::write(&blob, bytes).unwrap();
    assert_corrupt(tmp.path(), 3);
}

#[test]
fn missing_blob_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    fs::remove_file(tmp.path().join(read_manifest(tmp.path()).unwrap().vectors_file)).unwrap();
    assert_corrupt(tmp.path(), 3);
}

#[test]
fn short_hash_tolerates_truncated_checksum() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    let manifest = read_manifest(tmp.path()).unwrap();
    assert_eq!(manifest.short_hash(), &manifest.vectors_blake3[..16]);

    edit_manifest(tmp.path(), |m| m["vectors_blake3"] = Value::from("abc"));
    assert_eq!(read_manifest(tmp.path()).unwrap().short_hash(), "abc");
}

#[test]
fn unknown_schema_version_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    edit_manifest(tmp.path(), |m| m["schema_version"] = Value::from(99));
    assert_corrupt(tmp.path(), 3);
}

#[test]
fn reordered_passage_ids_are_corrupt() {
    let tmp = TempDir::new().unwrap();
    sample_index().save(tmp.path()).unwrap();
    edit_manifest(tmp.path(), |m| {
        m["passages"][0]["id"] = Value::from(1);
        m["passages"][1]["id"] = Value::from(0);
    });
    assert_corrupt(tmp.path(), 3);
}
