#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use picsearch_core::collaborators::PassthroughTranslator;
use picsearch_core::config::Settings;
use picsearch_core::error::{Error, Result};
use picsearch_core::traits::Captioner;
use picsearch_embed::FakeEmbedder;
use picsearch_hybrid::{ArtifactStore, Collaborators, IndexBuilder, SearchService};
use picsearch_text::AnalyzerLemmatizer;

pub const DIM: usize = 384;

/// Captions keyed by image file name; anything else fails captioning.
pub struct MapCaptioner(pub HashMap<String, String>);

impl Captioner for MapCaptioner {
    fn caption(&self, image_path: &Path) -> Result<String> {
        let name = image_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.0.get(&name).cloned().ok_or_else(|| Error::Captioning(format!("no caption for {}", name)))
    }
}

pub fn write_images(dir: &Path, names: &[&str]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), b"\x89PNG").unwrap();
    }
    dir.to_path_buf()
}

pub fn collaborators(captions: &[(&str, &str)]) -> Collaborators {
    let map = captions.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Collaborators {
        captioner: Arc::new(MapCaptioner(map)),
        translator: Arc::new(PassthroughTranslator),
        lemmatizer: Arc::new(AnalyzerLemmatizer::default()),
        embedder: Arc::new(FakeEmbedder::new(DIM)),
    }
}

pub fn builder(index_dir: &Path, collaborators: Collaborators) -> IndexBuilder {
    IndexBuilder::new(collaborators, ArtifactStore::new(index_dir), &Settings::default())
}

pub fn service(index_dir: &Path, collaborators: &Collaborators) -> SearchService {
    SearchService::from_settings(ArtifactStore::new(index_dir), collaborators, &Settings::default())
}

pub const SCENARIO_A: [(&str, &str); 3] = [
    ("horse.jpg", "a horse in a field"),
    ("car.jpg", "a red car"),
    ("dog.jpg", "a brown dog barking"),
];
