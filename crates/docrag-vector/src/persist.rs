//! On-disk form of a [`VectorIndex`]: one directory holding an Arrow IPC
//! vector blob and a JSON manifest with the passage texts.
//!
//! The blob is written under a content-addressed name first; the manifest is
//! then replaced via temp file + rename and is the commit point. `save` keeps
//! the blob of the manifest it replaces, and `load` re-reads the manifest when
//! the blob it names has been swept by a later save, so a reader racing a
//! writer gets either the old or the new index.

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, UInt64Array};
use arrow_ipc::reader::FileReader;
use arrow_ipc::writer::FileWriter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use docrag_core::{Error, Passage, Result};

use crate::index::VectorIndex;
use crate::schema::{build_arrow_schema, vector_item_field, FORMAT_VERSION, META_FORMAT_VERSION, META_VECTOR_DIM};

pub const MANIFEST_FILE: &str = "passages.json";
const BLOB_PREFIX: &str = "vectors-";
const BLOB_SUFFIX: &str = ".arrow";
/// Manifest generations `load` follows before giving up on a moving target.
const LOAD_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub vector_dim: usize,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedder_id: Option<String>,
    pub created_at: String,
    pub vectors_file: String,
    pub vectors_blake3: String,
    pub passages: Vec<Passage>,
}

impl Manifest {
    /// Leading 16 hex digits of the blob checksum, or all of it if shorter.
    pub fn short_hash(&self) -> &str {
        self.vectors_blake3.get(..16).unwrap_or(self.vectors_blake3.as_str())
    }
}

/// Read only the manifest, without touching the vector blob.
pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(Error::NotFound(format!("no index manifest at {}", path.display())));
    }
    let raw = fs::read_to_string(&path)?;
    serde_json::from_str(&raw).map_err(|e| Error::corrupt(&path, format!("unreadable manifest: {e}")))
}

impl VectorIndex {
    /// Persist into `dir`, replacing any index already there.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let blob = encode_vectors(self)?;
        let hash = blake3::hash(&blob).to_hex().to_string();
        let vectors_file = format!("{BLOB_PREFIX}{}{BLOB_SUFFIX}", &hash[..16]);

        let blob_path = dir.join(&vectors_file);
        write_atomically(&blob_path, &blob)?;
        debug!("Wrote {} ({} bytes)", blob_path.display(), blob.len());

        let manifest = Manifest {
            schema_version: FORMAT_VERSION,
            vector_dim: self.dim(),
            count: self.len(),
            embedder_id: self.embedder_id().map(str::to_string),
            created_at: Utc::now().to_rfc3339(),
            vectors_file: vectors_file.clone(),
            vectors_blake3: hash,
            passages: self.passages().to_vec(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| Error::Operation(format!("failed to serialize manifest: {e}")))?;
        let previous = read_manifest(dir).ok().map(|m| m.vectors_file);
        write_atomically(&dir.join(MANIFEST_FILE), &json)?;

        remove_stale_blobs(dir, &vectors_file, previous.as_deref());
        info!("Saved index: {} passages, dim {} -> {}", self.len(), self.dim(), dir.display());
        Ok(())
    }

    /// Load the index persisted in `dir`, verifying it against `dim` and
    /// against itself. Any inconsistency is `CorruptIndex`.
    pub fn load(dir: &Path, dim: usize) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let mut manifest = read_manifest(dir)?;
        let mut attempt = 1;
        let (blob_path, blob) = loop {
            check_manifest(&manifest, &manifest_path, dim)?;
            let blob_path = dir.join(&manifest.vectors_file);
            match fs::read(&blob_path) {
                Ok(blob) => break (blob_path, blob),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    let current = read_manifest(dir)?;
                    if current.vectors_file == manifest.vectors_file {
                        return Err(Error::corrupt(&blob_path, format!("unreadable vector blob: {e}")));
                    }
                    if attempt == LOAD_ATTEMPTS {
                        return Err(Error::Io(e));
                    }
                    debug!("{} was replaced during load, following the new manifest", manifest.vectors_file);
                    attempt += 1;
                    manifest = current;
                }
                Err(e) => return Err(Error::corrupt(&blob_path, format!("unreadable vector blob: {e}"))),
            }
        };

        let actual_hash = blake3::hash(&blob).to_hex().to_string();
        if actual_hash != manifest.vectors_blake3 {
            return Err(Error::corrupt(&blob_path, "checksum mismatch"));
        }

        let vectors = decode_vectors(&blob_path, blob, dim)?;
        if vectors.len() != manifest.count {
            return Err(Error::corrupt(
                &blob_path,
                format!("{} vectors for {} passages", vectors.len(), manifest.count),
            ));
        }

        let mut index = VectorIndex::new(dim)?;
        index.set_embedder_id(manifest.embedder_id);
        for (passage, vector) in manifest.passages.into_iter().zip(vectors) {
            index.add(passage, &vector).map_err(|e| Error::corrupt(&blob_path, e.to_string()))?;
        }
        info!("Loaded index: {} passages, dim {} from {}", index.len(), dim, dir.display());
        Ok(index)
    }
}

fn check_manifest(manifest: &Manifest, manifest_path: &Path, dim: usize) -> Result<()> {
    let corrupt = |reason: String| Error::corrupt(manifest_path, reason);
    if manifest.schema_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported schema_version {} (expected {FORMAT_VERSION})",
            manifest.schema_version
        )));
    }
    if manifest.vector_dim != dim {
        return Err(corrupt(format!("index has dimension {}, configured {dim}", manifest.vector_dim)));
    }
    if manifest.count != manifest.passages.len() {
        return Err(corrupt(format!(
            "manifest count {} but {} passages",
            manifest.count,
            manifest.passages.len()
        )));
    }
    if let Some((pos, p)) = manifest.passages.iter().enumerate().find(|(i, p)| p.id != *i as u64) {
        return Err(corrupt(format!("passage at position {pos} has id {}", p.id)));
    }
    if manifest.vectors_file.contains(['/', '\\']) || !manifest.vectors_file.starts_with(BLOB_PREFIX) {
        return Err(corrupt(format!("invalid vectors_file {:?}", manifest.vectors_file)));
    }
    Ok(())
}

fn encode_vectors(index: &VectorIndex) -> Result<Vec<u8>> {
    let encode_err = |e: arrow_schema::ArrowError| Error::Operation(format!("failed to encode vectors: {e}"));
    let dim = index.dim();
    let schema = build_arrow_schema(dim);
    let ids = UInt64Array::from_iter_values(index.passages().iter().map(|p| p.id));
    let values = Float32Array::from(index.raw_vectors().to_vec());
    let vectors = FixedSizeListArray::try_new(vector_item_field(), dim as i32, Arc::new(values), None).map_err(encode_err)?;
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(ids), Arc::new(vectors)]).map_err(encode_err)?;

    let mut buf = Vec::new();
    {
        let mut writer = FileWriter::try_new(&mut buf, &schema).map_err(encode_err)?;
        writer.write(&batch).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }
    Ok(buf)
}

fn decode_vectors(path: &Path, blob: Vec<u8>, dim: usize) -> Result<Vec<Vec<f32>>> {
    let corrupt = |reason: String| Error::corrupt(path, reason);
    let reader = FileReader::try_new(Cursor::new(blob), None).map_err(|e| corrupt(format!("invalid Arrow file: {e}")))?;

    let schema = reader.schema();
    let meta = schema.metadata();
    if meta.get(META_FORMAT_VERSION).map(String::as_str) != Some(FORMAT_VERSION.to_string().as_str()) {
        return Err(corrupt(format!("blob format_version {:?}", meta.get(META_FORMAT_VERSION))));
    }
    if meta.get(META_VECTOR_DIM).and_then(|d| d.parse::<usize>().ok()) != Some(dim) {
        return Err(corrupt(format!("blob vector_dim {:?}, expected {dim}", meta.get(META_VECTOR_DIM))));
    }

    let mut out: Vec<Vec<f32>> = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| corrupt(format!("unreadable record batch: {e}")))?;
        let ids = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
            .ok_or_else(|| corrupt("missing id column".to_string()))?;
        let vectors = batch
            .column_by_name("vector")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| corrupt("missing vector column".to_string()))?;
        if vectors.value_length() as usize != dim {
            return Err(corrupt(format!("vector width {}, expected {dim}", vectors.value_length())));
        }
        if ids.null_count() > 0 || vectors.null_count() > 0 {
            return Err(corrupt("null rows in vector blob".to_string()));
        }
        for row in 0..batch.num_rows() {
            let expected_id = out.len() as u64;
            if ids.value(row) != expected_id {
                return Err(corrupt(format!("row {expected_id} has id {}", ids.value(row))));
            }
            let list = vectors.value(row);
            let values = list
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| corrupt("vector values are not Float32".to_string()))?;
            if values.null_count() > 0 || values.values().iter().any(|x| !x.is_finite()) {
                return Err(corrupt(format!("row {expected_id} has non-finite components")));
            }
            out.push(values.values().to_vec());
        }
    }
    Ok(out)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp: PathBuf = path.with_file_name(tmp_name);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Delete every blob except the current one and the one it replaced.
fn remove_stale_blobs(dir: &Path, current: &str, previous: Option<&str>) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(BLOB_PREFIX) && name.ends_with(BLOB_SUFFIX) && name != current && Some(name.as_str()) != previous {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!("Could not remove stale blob {}: {}", entry.path().display(), e);
            }
        }
    }
}
