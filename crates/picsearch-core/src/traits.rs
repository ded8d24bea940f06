use std::path::Path;

use crate::error::Result;

/// Produces a natural-language caption for an image.
pub trait Captioner: Send + Sync {
    fn caption(&self, image_path: &Path) -> Result<String>;
}

/// Translates text into `target_language` (e.g. `"ka"`).
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Splits text into lemma tokens. Never fails; unrecognised input yields
/// fewer (or zero) tokens.
pub trait Lemmatizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
