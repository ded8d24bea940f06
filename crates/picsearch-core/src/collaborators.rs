//! File-backed captioner and identity translator.
//!
//! These let a corpus be indexed without a captioning or translation model:
//! captions are authored (or generated elsewhere) as text files next to each
//! image, already in the corpus language.

use std::path::Path;

use crate::error::{Error, Result};
use crate::traits::{Captioner, Translator};

/// Reads `photo.<sidecar_extension>` for `photo.jpg`.
pub struct SidecarCaptioner {
    extension: String,
}

impl SidecarCaptioner {
    pub fn new(extension: impl Into<String>) -> Self { Self { extension: extension.into() } }
}

impl Captioner for SidecarCaptioner {
    fn caption(&self, image_path: &Path) -> Result<String> {
        let sidecar = image_path.with_extension(&self.extension);
        let raw = std::fs::read(&sidecar).map_err(|e| Error::Captioning(format!("{}: {}", sidecar.display(), e)))?;
        let text = String::from_utf8_lossy(&raw).trim().to_string();
        if text.is_empty() {
            return Err(Error::Captioning(format!("{}: caption file is empty", sidecar.display())));
        }
        Ok(text)
    }
}

/// Returns its input unchanged.
#[derive(Default)]
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn translate(&self, text: &str, _target_language: &str) -> Result<String> { Ok(text.to_string()) }
}
