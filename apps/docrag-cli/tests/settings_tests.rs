use std::fs;
use std::path::Path;

use docrag_cli::load_settings;
use tempfile::TempDir;

#[test]
fn data_paths_resolve_against_config_dir() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(
        &config,
        "[data]\nraw_txt_dir = \"corpus\"\nindex_dir = \"/var/lib/docrag/index\"\n\n[embedding]\nprovider = \"fake\"\ndim = 8\n",
    )
    .unwrap();

    let settings = load_settings(Some(config.as_path())).expect("settings");
    assert_eq!(Path::new(&settings.data.raw_txt_dir), tmp.path().join("corpus"));
    assert_eq!(settings.data.index_dir, "/var/lib/docrag/index");
    assert_eq!(settings.embedding.dim, 8);
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let settings = load_settings(Some(tmp.path().join("absent.toml").as_path())).expect("settings");
    assert_eq!(settings.retrieval.top_k, 5);
    assert_eq!(Path::new(&settings.data.index_dir), tmp.path().join("data/index"));
}
