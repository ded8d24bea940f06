//! Offline index build: discover images, run the caption pipeline for each,
//! and write a complete generation of artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use picsearch_core::collaborators::{PassthroughTranslator, SidecarCaptioner};
use picsearch_core::config::Settings;
use picsearch_core::corpus::CorpusStore;
use picsearch_core::discovery::{list_images, ImageEntry};
use picsearch_core::error::{Error, Result};
use picsearch_core::traits::{Captioner, Embedder, Lemmatizer, Translator};
use picsearch_core::types::{BuildReport, CorpusVersion, Document};
use picsearch_embed::get_default_embedder;
use picsearch_text::{AnalyzerLemmatizer, LexicalIndex};
use picsearch_vector::{store, FlatL2Index};

use crate::artifacts::{ArtifactStore, Generation};

/// The external models a build and a search depend on.
#[derive(Clone)]
pub struct Collaborators {
    pub captioner: Arc<dyn Captioner>,
    pub translator: Arc<dyn Translator>,
    pub lemmatizer: Arc<dyn Lemmatizer>,
    pub embedder: Arc<dyn Embedder>,
}

impl Collaborators {
    /// Sidecar captions, passthrough translation, analyzer lemmas and the
    /// configured embedder.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            captioner: Arc::new(SidecarCaptioner::new(settings.captions.sidecar_extension.clone())),
            translator: Arc::new(PassthroughTranslator),
            lemmatizer: Arc::new(AnalyzerLemmatizer::new(&settings.lexical.stop_words)),
            embedder: get_default_embedder(&settings.embedding)?,
        })
    }
}

pub struct IndexBuilder {
    collaborators: Collaborators,
    store: ArtifactStore,
    extensions: Vec<String>,
    target_language: String,
    keep_generations: usize,
    show_progress: bool,
    running: tokio::sync::Mutex<()>,
}

impl IndexBuilder {
    pub fn new(collaborators: Collaborators, store: ArtifactStore, settings: &Settings) -> Self {
        Self {
            collaborators,
            store,
            extensions: settings.data.image_extensions.clone(),
            target_language: settings.captions.target_language.clone(),
            keep_generations: settings.data.keep_generations.max(1),
            show_progress: false,
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Draw a progress bar on stderr while captioning and embedding.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn store(&self) -> &ArtifactStore { &self.store }

    /// Build a new generation from the images under `image_root` and make it
    /// the active one. Images whose pipeline fails are skipped; a build that
    /// indexes nothing fails with `EmptyCorpus` and leaves the active
    /// generation untouched.
    pub async fn build(&self, image_root: &Path) -> Result<BuildReport> {
        let _running = self.running.try_lock().map_err(|_| Error::BuildInProgress(self.store.root().join(crate::artifacts::LOCK_FILE).display().to_string()))?;
        let _lock = self.store.lock()?;
        let start = Instant::now();

        let images = list_images(image_root, &self.extensions);
        tracing::info!(root = %image_root.display(), images = images.len(), "starting index build");

        let collaborators = self.collaborators.clone();
        let target_language = self.target_language.clone();
        let show_progress = self.show_progress;
        let (documents, skipped) = blocking(move || Ok(process_images(&collaborators, &target_language, &images, show_progress))).await?;

        if documents.is_empty() {
            tracing::warn!(skipped, "no image could be indexed");
            return Err(Error::EmptyCorpus);
        }

        let dimension = self.collaborators.embedder.dim();
        let version = corpus_version(&documents);
        let generation = self.store.allocate(&version)?;
        let image_root = std::fs::canonicalize(image_root).unwrap_or_else(|_| image_root.to_path_buf());
        let indexed = documents.len();
        if let Err(e) = write_generation(&generation, &image_root, dimension, documents).await {
            self.store.discard(&generation);
            return Err(e);
        }

        self.store.set_active(&generation.version)?;
        tracing::info!(version = %generation.version, documents = indexed, skipped, "activated generation");
        match self.store.prune(self.keep_generations) {
            Ok(removed) if !removed.is_empty() => tracing::debug!(removed = removed.len(), "pruned old generations"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "could not prune old generations"),
        }

        Ok(BuildReport {
            corpus_version: generation.version,
            documents_indexed: indexed,
            documents_skipped: skipped,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| Error::Storage(format!("build worker failed: {}", e)))?
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Run the pipeline over every image, assigning ids only to successes.
fn process_images(collaborators: &Collaborators, target_language: &str, images: &[ImageEntry], show_progress: bool) -> (Vec<Document>, usize) {
    let pb = progress_bar(images.len(), show_progress);
    let mut documents = Vec::with_capacity(images.len());
    let mut skipped = 0usize;
    for image in images {
        pb.set_message(image.relative.clone());
        match process_image(collaborators, target_language, &image.absolute) {
            Ok((caption, tokens, embedding)) => {
                let id = u32::try_from(documents.len()).unwrap_or(u32::MAX);
                documents.push(Document { id, path: image.relative.clone(), caption, tokens, embedding });
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(path = %image.relative, kind = e.kind(), error = %e, "skipping image");
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} indexed, {} skipped", documents.len(), skipped));
    (documents, skipped)
}

fn process_image(collaborators: &Collaborators, target_language: &str, path: &Path) -> Result<(String, Vec<String>, Vec<f32>)> {
    let english = collaborators.captioner.caption(path)?;
    let caption = collaborators.translator.translate(&english, target_language)?;
    let tokens = collaborators.lemmatizer.tokenize(&caption);
    let embedding = collaborators.embedder.embed(&caption)?;
    let expected = collaborators.embedder.dim();
    if embedding.len() != expected {
        return Err(Error::Embedding(format!("embedder returned {} values, expected {}", embedding.len(), expected)));
    }
    Ok((caption, tokens, embedding))
}

async fn write_generation(generation: &Generation, image_root: &Path, dimension: usize, documents: Vec<Document>) -> Result<()> {
    let vectors: Vec<Vec<f32>> = documents.iter().map(|d| d.embedding.clone()).collect();
    let index = FlatL2Index::build(dimension, &vectors)?;

    let target = generation.clone();
    let root: PathBuf = image_root.to_path_buf();
    blocking(move || {
        CorpusStore::save(target.corpus_dir(), &target.version, &root, dimension, &documents)?;
        let tokens: Vec<Vec<String>> = documents.into_iter().map(|d| d.tokens).collect();
        LexicalIndex::build(&target.lexical_dir(), &tokens, &target.version)?;
        Ok(())
    })
    .await?;

    store::save(&generation.vectors_dir(), &index, &generation.version).await
}

/// `<utc timestamp>-<fingerprint>`; the fingerprint covers every
/// `(path, caption)` pair in id order.
pub fn corpus_version(documents: &[Document]) -> CorpusVersion {
    let mut hasher = blake3::Hasher::new();
    for d in documents {
        hasher.update(d.path.as_bytes());
        hasher.update(&[0]);
        hasher.update(d.caption.as_bytes());
        hasher.update(&[0]);
    }
    let fingerprint = hasher.finalize().to_hex();
    CorpusVersion::new(format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%3fZ"), &fingerprint.as_str()[..12]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, path: &str, caption: &str) -> Document {
        Document { id, path: path.to_string(), caption: caption.to_string(), tokens: vec![], embedding: vec![] }
    }

    #[test]
    fn version_fingerprint_tracks_content() {
        let a = corpus_version(&[doc(0, "a.jpg", "a red car")]);
        let b = corpus_version(&[doc(0, "a.jpg", "a red car")]);
        let c = corpus_version(&[doc(0, "a.jpg", "a blue car")]);
        let tail = |v: &CorpusVersion| v.as_str().rsplit('-').next().unwrap_or_default().to_string();
        assert_eq!(tail(&a), tail(&b));
        assert_ne!(tail(&a), tail(&c));
        assert_eq!(tail(&a).len(), 12);
    }

    #[test]
    fn versions_sort_chronologically() {
        let first = corpus_version(&[doc(0, "z.jpg", "zzz")]);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = corpus_version(&[doc(0, "a.jpg", "aaa")]);
        assert!(first.as_str() < second.as_str());
    }
}
