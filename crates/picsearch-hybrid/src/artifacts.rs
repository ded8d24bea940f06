//! On-disk layout of built indexes.
//!
//! ```text
//! <root>/
//!   ACTIVE                      corpus version readers should load
//!   build.lock                  OS-locked by the running build, holder pid inside
//!   generations/<version>/
//!     corpus.json
//!     lexical/
//!     vectors/
//! ```
//!
//! A build writes a complete generation before `ACTIVE` is replaced by an
//! atomic rename, so readers see either the old or the new set, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};

use fs2::FileExt;
use std::path::{Path, PathBuf};

use picsearch_core::error::{Error, Result};
use picsearch_core::types::CorpusVersion;

pub const ACTIVE_FILE: &str = "ACTIVE";
pub const LOCK_FILE: &str = "build.lock";
pub const GENERATIONS_DIR: &str = "generations";
pub const LEXICAL_DIR: &str = "lexical";
pub const VECTORS_DIR: &str = "vectors";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

/// Paths of the three artifacts of one generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub version: CorpusVersion,
    pub dir: PathBuf,
}

impl Generation {
    pub fn corpus_dir(&self) -> &Path { &self.dir }
    pub fn lexical_dir(&self) -> PathBuf { self.dir.join(LEXICAL_DIR) }
    pub fn vectors_dir(&self) -> PathBuf { self.dir.join(VECTORS_DIR) }
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    fn generations_dir(&self) -> PathBuf { self.root.join(GENERATIONS_DIR) }

    pub fn generation(&self, version: &CorpusVersion) -> Generation {
        Generation { version: version.clone(), dir: self.generations_dir().join(version.as_str()) }
    }

    /// Create an empty directory for a new generation. If `version` is already
    /// taken a numeric suffix is appended, so the returned version may differ.
    pub fn allocate(&self, version: &CorpusVersion) -> Result<Generation> {
        fs::create_dir_all(self.generations_dir())?;
        let mut candidate = version.clone();
        for n in 1u32.. {
            let generation = self.generation(&candidate);
            match fs::create_dir(&generation.dir) {
                Ok(()) => return Ok(generation),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => candidate = CorpusVersion::new(format!("{}-{}", version, n)),
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Storage(format!("no free generation name for {}", version)))
    }

    /// Remove a generation directory; used to discard a failed build.
    pub fn discard(&self, generation: &Generation) {
        if let Err(e) = fs::remove_dir_all(&generation.dir) {
            tracing::warn!(dir = %generation.dir.display(), error = %e, "could not remove generation");
        }
    }

    /// The active corpus version, or `None` if nothing was ever activated.
    pub fn active_version(&self) -> Result<Option<CorpusVersion>> {
        let path = self.root.join(ACTIVE_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::CorpusLoad(format!("{}: {}", path.display(), e))),
        };
        let version = raw.trim();
        if version.is_empty() {
            return Err(Error::CorpusLoad(format!("{}: active pointer is empty", path.display())));
        }
        Ok(Some(CorpusVersion::new(version)))
    }

    /// Point readers at `version` by atomically replacing `ACTIVE`.
    pub fn set_active(&self, version: &CorpusVersion) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        writeln!(tmp, "{}", version)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.root.join(ACTIVE_FILE)).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// All generation versions on disk, oldest first.
    pub fn generations(&self) -> Result<Vec<CorpusVersion>> {
        let dir = self.generations_dir();
        if !dir.is_dir() { return Ok(Vec::new()); }
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                out.push(CorpusVersion::new(entry.file_name().to_string_lossy().into_owned()));
            }
        }
        out.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(out)
    }

    /// Delete all but the newest `keep` generations. The active generation
    /// always survives and counts towards `keep`.
    pub fn prune(&self, keep: usize) -> Result<Vec<CorpusVersion>> {
        let active = self.active_version()?;
        let mut kept = usize::from(active.is_some());
        let mut removed = Vec::new();
        for version in self.generations()?.into_iter().rev() {
            if active.as_ref() == Some(&version) { continue; }
            if kept < keep {
                kept += 1;
                continue;
            }
            fs::remove_dir_all(self.generation(&version).dir)?;
            removed.push(version);
        }
        Ok(removed)
    }

    /// Take the cross-process build lock. Fails with `BuildInProgress` while
    /// another holder exists. The lock is an advisory OS lock on `build.lock`,
    /// so the kernel releases it when the holder exits for any reason; a file
    /// left behind by a killed build does not block the next one.
    pub fn lock(&self) -> Result<BuildLock> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(&path)?;
        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(Error::BuildInProgress(format!("{} (held by pid {})", path.display(), holder.trim())));
            }
            return Err(e.into());
        }
        file.set_len(0)?;
        writeln!(&file, "{}", std::process::id())?;
        Ok(BuildLock { file, path })
    }
}

/// Held for the duration of a build; dropping it unlocks `build.lock`.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(lock = %self.path.display(), error = %e, "could not release build lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn no_active_pointer_means_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(ArtifactStore::new(tmp.path()).active_version().unwrap(), None);
    }

    #[test]
    fn active_pointer_round_trips_without_temp_leftovers() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store.set_active(&CorpusVersion::new("v1")).unwrap();
        store.set_active(&CorpusVersion::new("v2")).unwrap();
        assert_eq!(store.active_version().unwrap(), Some(CorpusVersion::new("v2")));
        let names: Vec<_> = fs::read_dir(tmp.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from(ACTIVE_FILE)]);
    }

    #[test]
    fn blank_active_pointer_is_a_load_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(ACTIVE_FILE), "\n").unwrap();
        let err = ArtifactStore::new(tmp.path()).active_version().unwrap_err();
        assert_eq!(err.kind(), "corpus_load");
    }

    #[test]
    fn allocate_never_reuses_a_directory() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let a = store.allocate(&CorpusVersion::new("v")).unwrap();
        let b = store.allocate(&CorpusVersion::new("v")).unwrap();
        assert_eq!(a.version.as_str(), "v");
        assert_eq!(b.version.as_str(), "v-1");
        assert!(a.dir.is_dir() && b.dir.is_dir());
    }

    #[test]
    fn second_lock_is_refused_until_first_drops() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let lock = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(Error::BuildInProgress(_))));
        drop(lock);
        store.lock().unwrap();
    }

    #[test]
    fn leftover_lock_file_from_a_dead_build_is_reclaimed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(LOCK_FILE), "4194304\n").unwrap();
        let store = ArtifactStore::new(tmp.path());
        let lock = store.lock().unwrap();
        let holder = fs::read_to_string(tmp.path().join(LOCK_FILE)).unwrap();
        assert_eq!(holder.trim(), std::process::id().to_string());
        assert!(matches!(store.lock(), Err(Error::BuildInProgress(_))));
        drop(lock);
    }

    #[test]
    fn prune_keeps_active_and_newest() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        for v in ["20260101", "20260102", "20260103", "20260104"] {
            store.allocate(&CorpusVersion::new(v)).unwrap();
        }
        store.set_active(&CorpusVersion::new("20260102")).unwrap();
        let removed = store.prune(2).unwrap();
        let left: Vec<String> = store.generations().unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(left, vec!["20260102", "20260104"]);
        assert_eq!(removed.len(), 2);
    }
}
