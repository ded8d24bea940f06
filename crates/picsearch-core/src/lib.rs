pub mod collaborators;
pub mod config;
pub mod corpus;
pub mod discovery;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
