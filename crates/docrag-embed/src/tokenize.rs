use anyhow::{anyhow, ensure, Result};
use candle_core::{Device, Tensor};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Make every encoding exactly `max_len` tokens: longer input is truncated,
/// shorter input is right-padded with `pad_id`.
pub fn configure_fixed_length(tokenizer: &mut Tokenizer, max_len: usize, pad_id: u32, pad_token: &str) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Invalid truncation settings: {}", e))?;
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_len),
        pad_id,
        pad_token: pad_token.to_string(),
        ..Default::default()
    }));
    Ok(())
}

/// Encode `texts` into `[B, T]` input-id and attention-mask tensors.
pub fn encode_batch(tokenizer: &Tokenizer, texts: &[String], device: &Device) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);
    ensure!(encodings.iter().all(|e| e.len() == seq_len), "tokenizer produced a ragged batch");

    let ids: Vec<u32> = encodings.iter().flat_map(|e| e.get_ids().iter().copied()).collect();
    let mask: Vec<u32> = encodings.iter().flat_map(|e| e.get_attention_mask().iter().copied()).collect();
    let input_ids = Tensor::from_vec(ids, (encodings.len(), seq_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (encodings.len(), seq_len), device)?;
    Ok((input_ids, attention_mask))
}
