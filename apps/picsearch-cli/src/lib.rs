//! Shared plumbing for the `picsearch-indexer` and `picsearch-search` binaries.

use std::path::{Path, PathBuf};

use picsearch_core::config::{resolve_with_base, Config, Settings};
use picsearch_core::error::Error;
use picsearch_core::types::SearchResult;
use tracing_subscriber::EnvFilter;

/// Log to stderr at `info` (`debug` with `-v`); `RUST_LOG` wins when set.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

/// Settings from `config.toml` / `config.<env>.toml` / `APP_*` in the working directory.
pub fn load_settings() -> anyhow::Result<(Settings, PathBuf)> {
    let base = std::env::current_dir()?;
    let settings = Config::load_from(&base)?.settings()?;
    Ok((settings, base))
}

/// `--index-dir` if given, else `data.index_dir` resolved against `base`.
pub fn index_dir(flag: Option<&Path>, settings: &Settings, base: &Path) -> PathBuf {
    match flag {
        Some(dir) => dir.to_path_buf(),
        None => resolve_with_base(base, &settings.data.index_dir),
    }
}

/// `(kind, message)` for a top-level failure.
pub fn describe_failure(err: &anyhow::Error) -> (&'static str, String) {
    match err.downcast_ref::<Error>() {
        Some(e) => (e.kind(), e.to_string()),
        None => ("internal", format!("{:#}", err)),
    }
}

pub fn format_results(results: &[SearchResult], json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(results)?);
    }
    if results.is_empty() {
        return Ok("no results".to_string());
    }
    Ok(results.iter().enumerate().map(|(i, r)| format!("{:>2}. {:>6.2}%  {}", i + 1, r.confidence, r.path)).collect::<Vec<_>>().join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> Vec<SearchResult> {
        vec![SearchResult { path: "dog.jpg".to_string(), confidence: 97.5 }, SearchResult { path: "car.jpg".to_string(), confidence: 2.5 }]
    }

    #[test]
    fn human_output_lists_rank_confidence_and_path() {
        let out = format_results(&results(), false).unwrap();
        assert_eq!(out.lines().next().unwrap(), " 1.  97.50%  dog.jpg");
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn json_output_round_trips() {
        let out = format_results(&results(), true).unwrap();
        let parsed: Vec<SearchResult> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, results());
    }

    #[test]
    fn domain_errors_keep_their_kind() {
        let err = anyhow::Error::from(Error::IndexNotLoaded);
        assert_eq!(describe_failure(&err).0, "index_not_loaded");
        assert_eq!(describe_failure(&anyhow::anyhow!("boom")).0, "internal");
    }

    #[test]
    fn explicit_index_dir_wins() {
        let settings = Settings::default();
        let base = Path::new("/srv/pics");
        assert_eq!(index_dir(Some(Path::new("/tmp/idx")), &settings, base), PathBuf::from("/tmp/idx"));
        assert_eq!(index_dir(None, &settings, base), PathBuf::from("/srv/pics/./index"));
    }
}
