//! picsearch-hybrid
//!
//! Index builds, the artifact layout they write, and hybrid BM25 + vector
//! search over the active generation.

pub mod artifacts;
pub mod builder;
pub mod ranker;
pub mod service;

pub use artifacts::ArtifactStore;
pub use builder::{Collaborators, IndexBuilder};
pub use ranker::{HybridRanker, RankedHit, RankerSettings};
pub use service::{LoadedIndex, SearchService};
