//! Pieces shared by the `docrag` and `docrag-indexer` binaries.

use std::path::{Path, PathBuf};

use anyhow::Context;
use docrag_core::config::{resolve_with_base, Config, Settings};
use tracing_subscriber::EnvFilter;

/// Log to stderr, `info` unless `RUST_LOG` says otherwise. Stdout stays
/// reserved for command output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Load settings from `config` (default `config.toml`) and resolve the data
/// paths relative to the config file's directory.
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let config_path = config.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = Config::load_file(&config_path)
        .with_context(|| format!("Error loading config {}", config_path.display()))?;
    let mut settings = config.settings()?;
    let base = config_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    settings.data.raw_txt_dir = resolve_with_base(base, &settings.data.raw_txt_dir).to_string_lossy().to_string();
    settings.data.index_dir = resolve_with_base(base, &settings.data.index_dir).to_string_lossy().to_string();
    Ok(settings)
}
