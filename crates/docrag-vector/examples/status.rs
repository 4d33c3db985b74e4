use std::path::PathBuf;

use docrag_vector::read_manifest;

fn main() -> anyhow::Result<()> {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data/index"));
    let manifest = read_manifest(&dir)?;
    println!("index: {}", dir.display());
    println!("schema_version={} vector_dim={} count={}", manifest.schema_version, manifest.vector_dim, manifest.count);
    println!("embedder={}", manifest.embedder_id.as_deref().unwrap_or("-"));
    println!("created_at={} vectors={} ({})", manifest.created_at, manifest.vectors_file, manifest.short_hash());
    Ok(())
}
