use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, DType, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{XLMRobertaModel, Config as XLMRobertaConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use docrag_core::{validate_embedding, Embedder, Embedding, Error};

use crate::pool::masked_mean_l2;
use crate::tokenize::{configure_fixed_length, encode_batch};

/// XLM-RoBERTa pad token.
const PAD_TOKEN_ID: u32 = 1;
const PAD_TOKEN: &str = "<pad>";
/// Texts per forward pass.
const BATCH_SIZE: usize = 16;

/// Sentence encoder running locally on candle (XLM-RoBERTa family, e.g.
/// `paraphrase-multilingual-mpnet-base-v2` or BGE-M3).
pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    id: String,
}

impl EmbeddingModel {
    pub fn new(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!("Loading embedding model from {}", model_dir.display());
        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        configure_fixed_length(&mut tokenizer, max_len, PAD_TOKEN_ID, PAD_TOKEN)?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = config.hidden_size;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "model".to_string());
        let id = format!("local:{}:d{}", name, dim);
        info!("Embedding model {} loaded (dim={}, max_len={})", id, dim, max_len);
        Ok(Self { model, tokenizer, device, dim, id })
    }

    /// Embed `texts` in fixed-size batches; one unit-norm vector per input.
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let start = Instant::now();
            let (input_ids, attention_mask) = encode_batch(&self.tokenizer, batch, &self.device)?;
            let token_type_ids = input_ids.zeros_like()?;
            let hidden_states = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
            let pooled = masked_mean_l2(&hidden_states, &attention_mask)?;
            out.extend(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?);
            let elapsed = start.elapsed();
            if elapsed.as_millis() > 100 * batch.len() as u128 { warn!("Slow embedding: {:?} for {} texts", elapsed, batch.len()); }
            debug!("Embedded {} texts in {:?}", batch.len(), elapsed);
        }
        Ok(out)
    }
}

impl Embedder for EmbeddingModel {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed(&self, text: &str) -> docrag_core::Result<Embedding> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| Error::EmbeddingFailure("model returned no vector".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> docrag_core::Result<Vec<Embedding>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let vectors = self.embed_texts(texts).map_err(|e| Error::EmbeddingFailure(format!("{e:#}")))?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingFailure(format!("{} vectors for {} texts", vectors.len(), texts.len())));
        }
        for v in &vectors { validate_embedding(self.dim, v)?; }
        Ok(vectors)
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { info!("Embedding device: Metal"); return dev; }
            Err(e) => warn!("Metal unavailable ({}), falling back to CPU", e),
        }
    }
    info!("Embedding device: CPU");
    Device::Cpu
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        debug!("Reading weights from {}", safetensors.display());
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        debug!("Reading weights from {}", pickle.display());
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Locate the model directory: explicit setting, then `APP_MODEL_DIR` /
/// `MODEL_DIR`, then the conventional `models/` locations.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = docrag_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        return Err(anyhow!("Configured model_dir {} does not exist", p.display()));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { info!("Using {}: {}", var, p.display()); return Ok(p); }
        }
    }
    for candidate in ["models/paraphrase-multilingual-mpnet-base-v2", "../models/paraphrase-multilingual-mpnet-base-v2", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { info!("Using model dir: {}", p.display()); return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate an embedding model directory"))
}
