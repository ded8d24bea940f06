//! picsearch-vector
//!
//! Exact flat L2 nearest-neighbour index over caption embeddings, persisted
//! with LanceDB.

pub mod flat;
pub mod schema;
pub mod store;
pub mod table;

pub use flat::FlatL2Index;
pub use store::StoredVectors;
