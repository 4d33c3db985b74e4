use anyhow::{ensure, Result};
use candle_core::Tensor;

/// Sentence vectors from token states: mean over the tokens the attention mask
/// keeps, then unit L2 norm. `hidden` is `[B, T, H]`, `attention_mask` is
/// `[B, T]`; the result is `[B, H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, tokens, _) = hidden.dims3()?;
    ensure!(
        attention_mask.dims() == [batch, tokens],
        "attention mask shape {:?} does not match hidden states [{}, {}, _]",
        attention_mask.dims(),
        batch,
        tokens
    );
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let kept = (mask.sum(1)? + 1e-9)?;
    let mean = summed.broadcast_div(&kept)?;
    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + 1e-12)?;
    Ok(mean.broadcast_div(&norm)?)
}
