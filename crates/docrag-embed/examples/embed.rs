use anyhow::Result;
use docrag_core::config::Config;
use docrag_embed::get_default_embedder;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let text = std::env::args().nth(1).unwrap_or_else(|| "Invoice total is $500.".to_string());
    let settings = Config::load()?.settings()?;
    let embedder = get_default_embedder(&settings.embedding)?;
    let v = embedder.embed(&text)?;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    println!("{} dim={} norm={:.4}", embedder.embedder_id(), v.len(), norm);
    println!("head: {:?}", &v[..v.len().min(8)]);
    Ok(())
}
