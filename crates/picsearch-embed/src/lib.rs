//! picsearch-embed
//!
//! Sentence embeddings for captions and queries: a candle BERT encoder
//! (paraphrase-multilingual-MiniLM-L12-v2 by default, D=384) with masked-mean
//! pooling, and a deterministic hashed bag-of-words embedder for tests and
//! model-less runs.

pub mod device;
pub mod pool;
pub mod tokenize;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use picsearch_core::config::EmbeddingSettings;
use picsearch_core::error::{Error, Result};
use picsearch_core::traits::Embedder;

pub use pool::masked_mean;

fn embed_err(e: impl std::fmt::Display) -> Error { Error::Embedding(e.to_string()) }

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
    normalize: bool,
}

impl MiniLmEmbedder {
    /// Load tokenizer, config and weights from a local sentence-transformers
    /// export. `model.safetensors` is preferred over `pytorch_model.bin`.
    pub fn load(model_dir: &Path, max_len: usize, normalize: bool) -> Result<Self> {
        let device = device::select_device();
        tracing::info!(model_dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;
        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("<pad>"))
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).map_err(|e| Error::Embedding(format!("{}: {}", config_path.display(), e)))?;
        let config: BertConfig = serde_json::from_str(&raw).map_err(|e| Error::Embedding(format!("{}: {}", config_path.display(), e)))?;

        let vb = weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config).map_err(embed_err)?;
        let dim = config.hidden_size;
        tracing::info!(dim, pad_id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, pad_id, normalize })
    }
}

fn weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        let bytes = std::fs::read(&safetensors)?;
        return VarBuilder::from_buffered_safetensors(bytes, DType::F32, device).map_err(embed_err);
    }
    let bin = model_dir.join("pytorch_model.bin");
    let tensors = candle_core::pickle::read_all(&bin).map_err(|e| Error::Embedding(format!("{}: {}", bin.display(), e)))?;
    Ok(VarBuilder::from_tensors(tensors.into_iter().collect(), DType::F32, device))
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| Error::Embedding("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let enc = tokenize::encode_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask)).map_err(embed_err)?;
        let pooled = masked_mean(&hidden, &enc.attention_mask, self.normalize)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu).and_then(|t| t.to_vec2()).map_err(embed_err)?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded");
        Ok(rows)
    }
}

/// Hashed bag-of-words embedder. Deterministic and L2-normalized; texts that
/// share words land near each other, which is enough for tests and demos.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        if self.dim == 0 { return Err(Error::Embedding("fake embedder has zero dimension".to_string())); }
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

fn fake_forced_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// `APP_MODEL_DIR` overrides the configured directory when it exists.
fn resolve_model_dir(configured: &str) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() { return Ok(p); }
        tracing::warn!(dir = %p.display(), "APP_MODEL_DIR does not exist, using configured model_dir");
    }
    let p = PathBuf::from(configured);
    if p.exists() { Ok(p) } else { Err(Error::Embedding(format!("model directory not found: {}", p.display()))) }
}

/// Build the embedder described by `settings`. The fake embedder is used when
/// `use_fake` is set or `APP_USE_FAKE_EMBEDDINGS=1`. A model whose hidden size
/// differs from `settings.dimension` is rejected.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_forced_by_env() {
        tracing::info!(dim = settings.dimension, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)));
    }
    let model_dir = resolve_model_dir(&settings.model_dir)?;
    let model = MiniLmEmbedder::load(&model_dir, settings.max_len, settings.normalize)?;
    if model.dim() != settings.dimension {
        return Err(Error::DimensionMismatch { expected: settings.dimension, actual: model.dim() });
    }
    Ok(Arc::new(model))
}
