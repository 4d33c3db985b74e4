//! Document loading and passage splitting for ingestion.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{ChunkingStrategy, RawDocument};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategy,
    pub max_words: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { strategy: ChunkingStrategy::Lines, max_words: 300, overlap_percent: 0.2 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Read every `.txt` file under `data_dir` (sorted by path), optionally
    /// keeping only the first `limit` files.
    pub fn load_documents(&self, data_dir: &Path, limit: Option<usize>) -> Result<Vec<RawDocument>> {
        let mut files = self.list_txt_files(data_dir);
        if files.is_empty() {
            info!("No .txt files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        if let Some(limit) = limit {
            if files.len() > limit {
                files.truncate(limit);
                info!("Limited to first {} files", limit);
            }
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Reading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let text = self.read_file_content(file_path)?;
            documents.push(RawDocument { name: self.extract_doc_name(file_path), text });
        }
        info!("Loaded {} documents from {}", documents.len(), data_dir.display());
        Ok(documents)
    }

    /// Cut one document into passage texts, in document order. Empty passages
    /// never come out of this.
    pub fn split(&self, text: &str) -> Vec<String> {
        match self.chunking_config.strategy {
            ChunkingStrategy::Lines => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            ChunkingStrategy::Paragraphs => self.split_paragraphs(text),
        }
    }

    fn split_paragraphs(&self, text: &str) -> Vec<String> {
        let normalized = text.replace("\r\n", "\n");
        let mut passages = Vec::new();
        for paragraph in normalized.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() { continue; }
            if paragraph.split_whitespace().count() <= self.chunking_config.max_words {
                passages.push(paragraph.split_whitespace().collect::<Vec<_>>().join(" "));
            } else {
                passages.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }
        passages
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = self.chunking_config.max_words;
        let overlap_words = (words_per_chunk as f32 * self.chunking_config.overlap_percent) as usize;
        // Overlap must leave the window advancing.
        let overlap_words = overlap_words.min(words_per_chunk.saturating_sub(1));
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn extract_doc_name(&self, file_path: &Path) -> String {
        file_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.display().to_string())
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort();
        txt_files
    }
}
