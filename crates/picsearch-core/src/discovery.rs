use std::path::{Path, PathBuf};

/// An image found under the build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub absolute: PathBuf,
    /// Path relative to the root, with `/` separators; this is what gets stored.
    pub relative: String,
}

/// Recursively list image files under `root` whose extension is in
/// `extensions` (case-insensitive), sorted by relative path. The returned
/// order is the document id order of a build. Entries the walk cannot read
/// are logged and skipped.
pub fn list_images(root: &Path, extensions: &[String]) -> Vec<ImageEntry> {
    let mut images = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 && e.io_error().is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) => break,
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                tracing::warn!(path = %path, error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() { continue; }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else { continue };
        if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) { continue; }
        let relative_path = path.strip_prefix(root).unwrap_or(path);
        let relative = relative_path.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        images.push(ImageEntry { absolute: path.to_path_buf(), relative });
    }
    images.sort_by(|a, b| a.relative.cmp(&b.relative));
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> { vec!["jpg".to_string(), "png".to_string()] }

    #[test]
    fn walks_recursively_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        std::fs::create_dir_all(dir.join("zoo/cats")).unwrap();
        for f in ["b.jpg", "a.PNG", "zoo/cats/c.jpg", "notes.txt", "zoo/readme.md"] {
            std::fs::write(dir.join(f), b"").unwrap();
        }
        let found: Vec<String> = list_images(dir, &exts()).into_iter().map(|e| e.relative).collect();
        assert_eq!(found, vec!["a.PNG", "b.jpg", "zoo/cats/c.jpg"]);
    }

    #[test]
    fn empty_or_missing_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(list_images(tmp.path(), &exts()).is_empty());
        assert!(list_images(&tmp.path().join("missing"), &exts()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_do_not_hide_the_rest() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("a.jpg"), b"").unwrap();
        std::fs::write(dir.join("c.jpg"), b"").unwrap();
        std::os::unix::fs::symlink(dir.join("gone"), dir.join("b.jpg")).unwrap();
        let found: Vec<String> = list_images(dir, &exts()).into_iter().map(|e| e.relative).collect();
        assert_eq!(found, vec!["a.jpg", "c.jpg"]);
    }
}
