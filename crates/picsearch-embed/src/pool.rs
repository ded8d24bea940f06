use candle_core::{DType, Tensor};

use picsearch_core::error::{Error, Result};

fn pool_err(e: candle_core::Error) -> Error { Error::Embedding(format!("pooling failed: {}", e)) }

/// Mean of the hidden states over unmasked tokens, `[B,T,H] -> [B,H]`,
/// optionally L2-normalized per row.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor, l2_normalize: bool) -> Result<Tensor> {
    let (batch, _time, hidden_dim) = hidden.dims3().map_err(pool_err)?;

    let mask = attention_mask.to_device(hidden.device()).and_then(|m| m.to_dtype(hidden.dtype())).map_err(pool_err)?;
    let mask_3d = mask.unsqueeze(2).map_err(pool_err)?;
    let mask_broadcast = mask_3d.broadcast_as(hidden.shape()).map_err(pool_err)?;
    let sum = (hidden * &mask_broadcast).and_then(|m| m.sum(1)).map_err(pool_err)?;
    // all-masked rows would divide by zero
    let lengths = mask.sum(1).and_then(|l| l.unsqueeze(1)).and_then(|l| l.clamp(1e-9f32, f32::MAX)).map_err(pool_err)?;
    let mut mean = sum.broadcast_div(&lengths).map_err(pool_err)?;

    if l2_normalize {
        let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
        let norm = mean.sqr().and_then(|s| s.sum_keepdim(1)).and_then(|s| s.sqrt()).and_then(|n| n.affine(1.0, f64::from(eps_val))).map_err(pool_err)?;
        mean = mean.broadcast_div(&norm).map_err(pool_err)?;
    }
    if mean.dims() != [batch, hidden_dim] {
        return Err(Error::Embedding(format!("pooled shape {:?}, expected [{}, {}]", mean.dims(), batch, hidden_dim)));
    }
    Ok(mean)
}
