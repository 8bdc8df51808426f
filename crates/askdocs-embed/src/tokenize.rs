use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use tokenizers::Tokenizer;

const PAD_ID: u32 = 1;

/// Encodes `text` to fixed-length `(input_ids, attention_mask, token_type_ids)`, each `[1, max_len]`.
pub fn tokenize_on_device(
    tokenizer: &Tokenizer,
    text: &str,
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    ids.truncate(max_len);
    mask.truncate(max_len);
    if ids.len() < max_len {
        let pad = max_len - ids.len();
        ids.extend(std::iter::repeat(PAD_ID).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    let token_type_ids = Tensor::zeros((1, max_len), DType::I64, device)?;
    Ok((input_ids, attention_mask, token_type_ids))
}
