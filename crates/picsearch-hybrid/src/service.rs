//! Online search over the active generation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use picsearch_core::config::Settings;
use picsearch_core::corpus::{CorpusStore, CorpusTable};
use picsearch_core::error::{Error, Result};
use picsearch_core::traits::{Embedder, Lemmatizer, Translator};
use picsearch_core::types::{BuildReport, CorpusVersion, SearchResult};
use picsearch_text::LexicalIndex;
use picsearch_vector::{store as vector_store, FlatL2Index};

use crate::artifacts::ArtifactStore;
use crate::builder::{Collaborators, IndexBuilder};
use crate::ranker::{HybridRanker, RankedHit, RankerSettings};

/// The three artifacts of one generation, verified to describe the same corpus.
pub struct LoadedIndex {
    pub version: CorpusVersion,
    pub corpus: CorpusTable,
    pub lexical: LexicalIndex,
    pub vectors: FlatL2Index,
}

impl LoadedIndex {
    /// Load the generation named by the active pointer.
    pub async fn load_active(store: &ArtifactStore) -> Result<Self> {
        let version = store.active_version()?.ok_or(Error::IndexNotLoaded)?;
        Self::load(store, &version).await
    }

    pub async fn load(store: &ArtifactStore, version: &CorpusVersion) -> Result<Self> {
        let generation = store.generation(version);
        if !generation.dir.is_dir() {
            return Err(Error::CorpusLoad(format!("generation {} not found under {}", version, store.root().display())));
        }
        let corpus = CorpusStore::load(generation.corpus_dir())?;
        let lexical = LexicalIndex::open(&generation.lexical_dir())?;
        let stored = vector_store::load(&generation.vectors_dir()).await?;
        let loaded = Self { version: version.clone(), corpus, lexical, vectors: stored.index };
        loaded.verify(&stored.version)?;
        Ok(loaded)
    }

    /// All artifacts must carry the expected version, the same document
    /// count, and the same embedding dimension.
    fn verify(&self, vectors_version: &CorpusVersion) -> Result<()> {
        let versions = [("corpus", self.corpus.version()), ("lexical", self.lexical.version()), ("vectors", vectors_version)];
        for (artifact, found) in versions {
            if found != &self.version {
                return Err(Error::CorpusLoad(format!("{} artifact has version {}, expected {}", artifact, found, self.version)));
            }
        }
        let (n_corpus, n_lexical, n_vectors) = (self.corpus.len(), self.lexical.num_docs(), self.vectors.len());
        if n_corpus != n_lexical || n_corpus != n_vectors {
            return Err(Error::CorpusLoad(format!("document counts differ: corpus {}, lexical {}, vectors {}", n_corpus, n_lexical, n_vectors)));
        }
        if self.corpus.dimension() != self.vectors.dimension() {
            return Err(Error::CorpusLoad(format!("corpus dimension {} does not match vector dimension {}", self.corpus.dimension(), self.vectors.dimension())));
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.corpus.len() }

    pub fn is_empty(&self) -> bool { self.corpus.is_empty() }
}

/// Query translation applied before tokenizing and embedding.
#[derive(Clone)]
struct QueryTranslation {
    translator: Arc<dyn Translator>,
    target_language: String,
}

pub struct SearchService {
    store: ArtifactStore,
    lemmatizer: Arc<dyn Lemmatizer>,
    embedder: Arc<dyn Embedder>,
    translation: Option<QueryTranslation>,
    ranker: HybridRanker,
    loaded: RwLock<Option<Arc<LoadedIndex>>>,
    reload: Mutex<()>,
}

impl SearchService {
    pub fn new(store: ArtifactStore, lemmatizer: Arc<dyn Lemmatizer>, embedder: Arc<dyn Embedder>, ranker: RankerSettings) -> Self {
        Self { store, lemmatizer, embedder, translation: None, ranker: HybridRanker::new(ranker), loaded: RwLock::new(None), reload: Mutex::new(()) }
    }

    /// Query translation is enabled by `captions.translate_queries`.
    pub fn from_settings(store: ArtifactStore, collaborators: &Collaborators, settings: &Settings) -> Self {
        let service = Self::new(store, collaborators.lemmatizer.clone(), collaborators.embedder.clone(), RankerSettings::from(&settings.search));
        if settings.captions.translate_queries {
            service.with_query_translator(collaborators.translator.clone(), settings.captions.target_language.clone())
        } else {
            service
        }
    }

    pub fn with_query_translator(mut self, translator: Arc<dyn Translator>, target_language: impl Into<String>) -> Self {
        self.translation = Some(QueryTranslation { translator, target_language: target_language.into() });
        self
    }

    pub fn store(&self) -> &ArtifactStore { &self.store }

    /// Load the active generation and swap it in. On failure the previously
    /// loaded index, if any, keeps serving.
    pub async fn load(&self) -> Result<CorpusVersion> {
        let _guard = self.reload.lock().await;
        let index = self.swap_in(LoadedIndex::load_active(&self.store).await?)?;
        Ok(index.version.clone())
    }

    fn swap_in(&self, index: LoadedIndex) -> Result<Arc<LoadedIndex>> {
        if index.vectors.dimension() != self.embedder.dim() {
            return Err(Error::DimensionMismatch { expected: index.vectors.dimension(), actual: self.embedder.dim() });
        }
        tracing::info!(version = %index.version, documents = index.len(), "index loaded");
        let index = Arc::new(index);
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = Some(index.clone());
        Ok(index)
    }

    /// The index a query should run against: the loaded one while it is still
    /// the active generation, otherwise the active generation freshly loaded.
    async fn refresh(&self) -> Result<Arc<LoadedIndex>> {
        let current = self.current();
        let Some(active) = self.store.active_version()? else {
            return current.ok_or(Error::IndexNotLoaded);
        };
        if let Some(index) = current.filter(|index| index.version == active) {
            return Ok(index);
        }
        let _guard = self.reload.lock().await;
        // another query may have reloaded while we waited
        if let Some(index) = self.current().filter(|index| index.version == active) {
            return Ok(index);
        }
        tracing::debug!(version = %active, "active generation changed, reloading");
        self.swap_in(LoadedIndex::load(&self.store, &active).await?)
    }

    /// Run a build with `builder`, then load the generation it activated.
    pub async fn rebuild(&self, builder: &IndexBuilder, image_root: &Path) -> Result<BuildReport> {
        let report = builder.build(image_root).await?;
        self.load().await?;
        Ok(report)
    }

    pub fn loaded_version(&self) -> Option<CorpusVersion> {
        self.current().map(|index| index.version.clone())
    }

    /// On-disk location of a result path, under the image root the loaded
    /// generation was built from.
    pub fn absolute_path(&self, path: &str) -> Result<PathBuf> {
        let index = self.current().ok_or(Error::IndexNotLoaded)?;
        Ok(index.corpus.resolve(path))
    }

    fn current(&self) -> Option<Arc<LoadedIndex>> {
        self.loaded.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        Ok(self.search_detailed(query, k).await?.into_iter().map(|hit| SearchResult { path: hit.path, confidence: hit.confidence }).collect())
    }

    /// Like [`search`](Self::search) but keeps every intermediate score.
    pub async fn search_detailed(&self, query: &str, k: usize) -> Result<Vec<RankedHit>> {
        // pinned for the whole query; a concurrent reload swaps the slot, not this index
        let index = self.refresh().await?;
        if k == 0 || index.is_empty() {
            return Ok(Vec::new());
        }

        let translated;
        let query = match &self.translation {
            Some(t) => {
                translated = t.translator.translate(query, &t.target_language)?;
                translated.as_str()
            }
            None => query,
        };
        let tokens = self.lemmatizer.tokenize(query);
        let query_vector = self.embedder.embed(query)?;

        let n = self.ranker.candidate_count(k, index.vectors.len());
        let candidates = index.vectors.search(&query_vector, n)?;
        let lexical_scores = index.lexical.score(&tokens)?;
        tracing::debug!(tokens = tokens.len(), candidates = candidates.len(), k, "ranking query");

        self.ranker
            .rank(&candidates, &lexical_scores, k)
            .into_iter()
            .map(|s| {
                let meta = index.corpus.get(s.id).ok_or_else(|| Error::CorpusLoad(format!("document {} missing from corpus table", s.id)))?;
                Ok(RankedHit { id: s.id, path: meta.path.clone(), bm25: s.bm25, distance: s.distance, combined: s.combined, confidence: s.confidence })
            })
            .collect()
    }
}
