//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys separated by `__`, e.g.
//! `APP_SEARCH__ALPHA=0.5`). Provides helpers to expand `~` and `${VAR}` and
//! to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub captions: CaptionSettings,
    pub embedding: EmbeddingSettings,
    pub lexical: LexicalSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub image_dir: String,
    pub index_dir: String,
    pub image_extensions: Vec<String>,
    /// Generations kept on disk after a successful build, the active one included.
    pub keep_generations: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            image_dir: "./pictures".to_string(),
            index_dir: "./index".to_string(),
            image_extensions: ["jpg", "jpeg", "png", "gif", "bmp", "webp"].iter().map(|s| s.to_string()).collect(),
            keep_generations: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Extension of the caption file stored next to each image (`photo.jpg` -> `photo.txt`).
    pub sidecar_extension: String,
    pub target_language: String,
    /// Translate queries into `target_language` before ranking.
    pub translate_queries: bool,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self { sidecar_extension: "txt".to_string(), target_language: "ka".to_string(), translate_queries: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dimension: usize,
    pub model_dir: String,
    pub max_len: usize,
    pub normalize: bool,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimension: 384,
            model_dir: "models/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            max_len: 128,
            normalize: false,
            use_fake: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    pub stop_words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Weight of the lexical term; the distance term gets `1 - alpha`.
    pub alpha: f32,
    pub rescale_offset: f32,
    pub rescale_factor: f32,
    /// Vector candidates retrieved per requested result.
    pub candidate_multiplier: usize,
    pub default_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { alpha: 0.7, rescale_offset: 1.0, rescale_factor: 50.0, candidate_multiplier: 2, default_limit: 10 }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let s = &self.search;
        if !(0.0..=1.0).contains(&s.alpha) {
            return Err(Error::InvalidConfig(format!("search.alpha must be within [0, 1], got {}", s.alpha)));
        }
        if !s.rescale_factor.is_finite() || s.rescale_factor <= 0.0 {
            return Err(Error::InvalidConfig(format!("search.rescale_factor must be a positive number, got {}", s.rescale_factor)));
        }
        if !s.rescale_offset.is_finite() {
            return Err(Error::InvalidConfig("search.rescale_offset must be finite".to_string()));
        }
        if s.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("search.candidate_multiplier must be at least 1".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".to_string()));
        }
        if self.data.keep_generations == 0 {
            return Err(Error::InvalidConfig("data.keep_generations must be at least 1".to_string()));
        }
        if self.data.image_extensions.is_empty() {
            return Err(Error::InvalidConfig("data.image_extensions must not be empty".to_string()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load `config.toml` and the env-specific overlay from `base`.
    pub fn load_from(base: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(base.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            other => tracing::debug!(env = other, "no env-specific config overlay"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
