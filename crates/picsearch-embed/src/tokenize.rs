use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use picsearch_core::error::{Error, Result};

/// Model inputs for one batch, each shaped `[B, T]`.
pub struct Encoded {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Encode `texts`, truncating each to `max_len` and right-padding the batch to
/// its longest member with `pad_id` (mask 0).
pub fn encode_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, pad_id: u32, device: &Device) -> Result<Encoded> {
    let mut rows: Vec<(Vec<u32>, Vec<u32>)> = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| Error::Embedding(format!("tokenization failed: {}", e)))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > max_len { ids.truncate(max_len); mask.truncate(max_len); }
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let batch = rows.len();

    let mut flat_ids = Vec::with_capacity(batch * width);
    let mut flat_mask = Vec::with_capacity(batch * width);
    for (mut ids, mut mask) in rows {
        let pad = width - ids.len();
        ids.extend(std::iter::repeat(pad_id).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
        flat_ids.extend(ids);
        flat_mask.extend(mask);
    }

    let to_tensor = |v: Vec<u32>| Tensor::from_vec(v, (batch, width), device).map_err(|e| Error::Embedding(e.to_string()));
    let input_ids = to_tensor(flat_ids)?;
    let attention_mask = to_tensor(flat_mask)?;
    let token_type_ids = input_ids.zeros_like().map_err(|e| Error::Embedding(e.to_string()))?;
    Ok(Encoded { input_ids, token_type_ids, attention_mask })
}
