//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_EMBEDDING__PROVIDER=fake`). Values are
//! read either ad hoc with [`Config::get`] or as the typed [`Settings`] tree.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::types::{ChunkingStrategy, IngestMode};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_file("config.toml")
    }

    /// Same layering as [`Config::load`] but with an explicit base file; the
    /// env-specific file is looked up next to it.
    pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = path.parent().unwrap_or(Path::new(""));

        let mut figment = Figment::new().merge(Toml::file(path));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Build from an inline TOML document, without env overlays.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::string(toml)) };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to parse settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if matches!(env, "prod" | "production") && settings.embedding.provider == EmbeddingProvider::Fake {
            anyhow::bail!("fake embeddings are not allowed in production");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
    pub generation: GenerationSettings,
}

impl Settings {
    fn validate(&self) -> anyhow::Result<()> {
        if self.embedding.dim == 0 {
            anyhow::bail!("embedding.dim must be positive");
        }
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be positive");
        }
        if self.ingest.max_words == 0 {
            anyhow::bail!("ingest.max_words must be positive");
        }
        if !(0.0..1.0).contains(&self.ingest.overlap_percent) {
            anyhow::bail!("ingest.overlap_percent must be in [0, 1)");
        }
        if self.ingest.batch_size == 0 {
            anyhow::bail!("ingest.batch_size must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory of extracted `.txt` documents to ingest.
    pub raw_txt_dir: String,
    /// Directory holding the persisted index artifacts.
    pub index_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { raw_txt_dir: "data/txt".to_string(), index_dir: "data/index".to_string() }
    }
}

impl DataSettings {
    pub fn raw_txt_path(&self) -> PathBuf { expand_path(&self.raw_txt_dir) }
    pub fn index_path(&self) -> PathBuf { expand_path(&self.index_dir) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Local,
    Ollama,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Dimension every stored vector must have.
    pub dim: usize,
    /// Token limit for the local model.
    pub max_len: usize,
    pub model_dir: Option<String>,
    pub ollama_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            dim: 768,
            max_len: 256,
            model_dir: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Fail with `EmptyCorpus` instead of returning an empty context.
    pub require_results: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_k: 5, require_results: false } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub mode: IngestMode,
    pub chunking: ChunkingStrategy,
    pub max_words: usize,
    pub overlap_percent: f32,
    /// Passages sent to the embedder per call.
    pub batch_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { mode: IngestMode::Strict, chunking: ChunkingStrategy::Lines, max_words: 300, overlap_percent: 0.2, batch_size: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub ollama_url: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
            system_prompt: "You are an AI assistant specialized in document analysis.".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
