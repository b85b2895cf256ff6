//! Directory-backed library store.
//!
//! Writers stage both artifacts as temp files, then rename them into
//! place while holding the write lock, so readers in this process see
//! either the old pair or the new one. An overwritten source is parked
//! next to the new one until the metadata lands and is restored if it
//! does not.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tasksmith_core::error::LibraryError;
use tasksmith_core::library::{LibraryEntry, UnitMetadata};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::stem::normalize_stem;

/// Source file name (`stem.ext`) → parameter docs, ordered by name.
pub type LibraryIndex = BTreeMap<String, Vec<String>>;

const METADATA_EXT: &str = "json";

/// What a removal actually deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOutcome {
    pub source_removed: bool,
    pub metadata_removed: bool,
}

/// The persisted function library.
pub struct LibraryStore {
    dir: PathBuf,
    extension: String,
    lock: RwLock<()>,
}

impl LibraryStore {
    /// Create a store rooted at `dir` whose sources use `extension`
    /// (without the dot). The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path of the source artifact for `name`.
    pub fn source_path(&self, name: &str) -> Result<PathBuf, LibraryError> {
        let stem = normalize_stem(name)?;
        Ok(self.source_path_for(&stem))
    }

    fn source_path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{}", self.extension))
    }

    fn metadata_path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{METADATA_EXT}"))
    }

    /// Scan the directory and list every complete entry.
    ///
    /// A missing directory is an empty library.
    pub async fn entries(&self) -> Vec<LibraryEntry> {
        let _guard = self.lock.read().await;
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "Failed to scan library");
                }
                return Vec::new();
            }
        };

        let mut stems = Vec::new();
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        stems.push(stem.to_string());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Library scan interrupted");
                    break;
                }
            }
        }
        stems.sort();

        let mut entries = Vec::with_capacity(stems.len());
        for stem in stems {
            if let Some(entry) = self.load(&stem).await {
                entries.push(entry);
            }
        }
        entries
    }

    /// The index sent to the matcher: `{"stem.ext": [args_doc..]}`.
    pub async fn index(&self) -> LibraryIndex {
        self.entries()
            .await
            .into_iter()
            .map(|e| (format!("{}.{}", e.stem, self.extension), e.args_doc))
            .collect()
    }

    /// Look up one entry. Absent when either artifact is missing or the
    /// metadata does not parse.
    pub async fn get(&self, name: &str) -> Option<LibraryEntry> {
        let stem = normalize_stem(name).ok()?;
        let _guard = self.lock.read().await;
        self.load(&stem).await
    }

    async fn load(&self, stem: &str) -> Option<LibraryEntry> {
        let source = tokio::fs::read_to_string(self.source_path_for(stem)).await.ok()?;
        let raw = tokio::fs::read_to_string(self.metadata_path_for(stem)).await.ok()?;
        let metadata: UnitMetadata = match serde_json::from_str(&raw) {
            Ok(m) => m,
            Err(e) => {
                debug!(stem, error = %e, "Ignoring entry with malformed metadata");
                return None;
            }
        };
        Some(LibraryEntry {
            stem: stem.to_string(),
            function_name: metadata.function_name,
            source,
            args_doc: metadata.args_doc,
        })
    }

    /// Read a unit's current source text.
    pub async fn read_source(&self, name: &str) -> Result<String, LibraryError> {
        let path = self.source_path(name)?;
        let _guard = self.lock.read().await;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LibraryError::NotFound(name.to_string())
            } else {
                io_error(&path, e)
            }
        })
    }

    /// Publish a unit. An existing entry with the same stem is overwritten.
    pub async fn save(
        &self,
        function_name: &str,
        source: &str,
        args_doc: &[String],
    ) -> Result<LibraryEntry, LibraryError> {
        let stem = normalize_stem(function_name)?;
        let metadata = UnitMetadata {
            function_name: function_name.to_string(),
            args_doc: args_doc.to_vec(),
        };
        let metadata_json = serde_json::to_string_pretty(&metadata).map_err(|e| {
            LibraryError::MalformedMetadata {
                stem: stem.clone(),
                reason: e.to_string(),
            }
        })?;

        let _guard = self.lock.write().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let source_path = self.source_path_for(&stem);
        let metadata_path = self.metadata_path_for(&stem);
        let source_tmp = stage(&source_path, source).await?;
        let metadata_tmp = match stage(&metadata_path, &metadata_json).await {
            Ok(tmp) => tmp,
            Err(e) => {
                discard(&source_tmp).await;
                return Err(e);
            }
        };

        let parked = match self.park_existing(&stem, &source_path).await {
            Ok(parked) => parked,
            Err(e) => {
                discard(&source_tmp).await;
                discard(&metadata_tmp).await;
                return Err(e);
            }
        };

        let published = match tokio::fs::rename(&source_tmp, &source_path).await {
            Ok(()) => tokio::fs::rename(&metadata_tmp, &metadata_path)
                .await
                .map_err(|e| io_error(&metadata_path, e)),
            Err(e) => Err(io_error(&source_path, e)),
        };

        if let Err(e) = published {
            warn!(stem = %stem, error = %e, "Publish failed, restoring previous state");
            discard(&source_tmp).await;
            discard(&metadata_tmp).await;
            discard(&source_path).await;
            if let Some(parked) = &parked {
                if let Err(restore) = tokio::fs::rename(parked, &source_path).await {
                    warn!(stem = %stem, error = %restore, "Restoring previous source failed");
                }
            }
            return Err(e);
        }

        if let Some(parked) = &parked {
            discard(parked).await;
        }

        info!(stem = %stem, "Unit saved to library");
        Ok(LibraryEntry {
            stem,
            function_name: metadata.function_name,
            source: source.to_string(),
            args_doc: metadata.args_doc,
        })
    }

    /// Move an existing source aside. `None` when there was nothing to move.
    async fn park_existing(&self, stem: &str, source_path: &Path) -> Result<Option<PathBuf>, LibraryError> {
        let parked = self.dir.join(format!(".{stem}.{}.prev", self.extension));
        match tokio::fs::rename(source_path, &parked).await {
            Ok(()) => Ok(Some(parked)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(source_path, e)),
        }
    }

    /// Delete both artifacts of an entry. Both deletions are attempted
    /// even when the first fails.
    pub async fn remove(&self, name: &str) -> Result<RemoveOutcome, LibraryError> {
        let stem = normalize_stem(name)?;
        let _guard = self.lock.write().await;

        let source = remove_if_present(&self.source_path_for(&stem)).await;
        let metadata = remove_if_present(&self.metadata_path_for(&stem)).await;

        match (source, metadata) {
            (Ok(false), Ok(false)) => Err(LibraryError::NotFound(stem)),
            (Ok(source_removed), Ok(metadata_removed)) => {
                info!(stem = %stem, source_removed, metadata_removed, "Unit removed from library");
                Ok(RemoveOutcome {
                    source_removed,
                    metadata_removed,
                })
            }
            (Err(e), _) | (_, Err(e)) => Err(LibraryError::PartialRemoval {
                stem,
                reason: e.to_string(),
            }),
        }
    }
}

/// Write `content` to a hidden temp file next to `path`.
async fn stage(path: &Path, content: &str) -> Result<PathBuf, LibraryError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unit");
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    if let Err(e) = tokio::fs::write(&tmp, content).await {
        return Err(io_error(&tmp, e));
    }
    Ok(tmp)
}

/// Best-effort delete; a missing file is fine.
async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to clean up library file");
        }
    }
}

/// `Ok(true)` when the file was deleted, `Ok(false)` when it did not exist.
async fn remove_if_present(path: &Path) -> Result<bool, LibraryError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(path, e)),
    }
}

fn io_error(path: &Path, e: std::io::Error) -> LibraryError {
    LibraryError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> LibraryStore {
        LibraryStore::new(dir.join("library"), "py")
    }

    const SOURCE: &str = "def main(folder):\n    return folder\n";

    #[tokio::test]
    async fn save_then_get_and_index() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());

        let entry = lib
            .save("list files", SOURCE, &["1st: folder path".into()])
            .await
            .unwrap();
        assert_eq!(entry.stem, "list_files");

        let loaded = lib.get("list_files").await.unwrap();
        assert_eq!(loaded.function_name, "list files");
        assert_eq!(loaded.source, SOURCE);

        let index = lib.index().await;
        assert_eq!(index.len(), 1);
        assert_eq!(index["list_files.py"], vec!["1st: folder path".to_string()]);

        // Lookup by file name works too
        assert!(lib.get("list_files.py").await.is_some());
    }

    #[tokio::test]
    async fn missing_directory_is_empty_library() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        assert!(lib.index().await.is_empty());
        assert!(lib.get("anything").await.is_none());
    }

    #[tokio::test]
    async fn half_entries_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        std::fs::create_dir_all(lib.dir()).unwrap();

        // Source without metadata
        std::fs::write(lib.dir().join("orphan.py"), SOURCE).unwrap();
        // Source with unparseable metadata
        std::fs::write(lib.dir().join("broken.py"), SOURCE).unwrap();
        std::fs::write(lib.dir().join("broken.json"), "{oops").unwrap();
        // Metadata without source
        std::fs::write(lib.dir().join("ghost.json"), r#"{"function_name":"ghost"}"#).unwrap();

        assert!(lib.index().await.is_empty());
        assert!(lib.get("orphan").await.is_none());
        assert!(lib.get("broken").await.is_none());
        assert!(lib.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn failed_metadata_publish_leaves_neither_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        // A directory squatting on the metadata path makes the rename fail
        std::fs::create_dir_all(lib.dir().join("blocked.json").join("inner")).unwrap();

        let result = lib.save("blocked", SOURCE, &[]).await;
        assert!(matches!(result, Err(LibraryError::Io { .. })));
        assert!(!lib.dir().join("blocked.py").exists());
        assert!(!lib.dir().join(".blocked.json.tmp").exists());
        assert!(lib.get("blocked").await.is_none());
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_previous_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        lib.save("task", SOURCE, &["1st: folder".into()]).await.unwrap();

        // A directory on the metadata temp path makes staging fail
        std::fs::create_dir_all(lib.dir().join(".task.json.tmp").join("inner")).unwrap();
        let result = lib.save("task", "def main():\n    return 2\n", &[]).await;
        assert!(matches!(result, Err(LibraryError::Io { .. })));

        let entry = lib.get("task").await.unwrap();
        assert_eq!(entry.source, SOURCE);
        assert_eq!(entry.args_doc, vec!["1st: folder".to_string()]);
        assert!(!lib.dir().join(".task.py.tmp").exists());
    }

    #[tokio::test]
    async fn failed_metadata_rename_restores_previous_source() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        std::fs::create_dir_all(lib.dir()).unwrap();
        std::fs::write(lib.dir().join("task.py"), SOURCE).unwrap();
        std::fs::create_dir_all(lib.dir().join("task.json").join("inner")).unwrap();

        let result = lib.save("task", "def main():\n    return 2\n", &[]).await;
        assert!(matches!(result, Err(LibraryError::Io { .. })));

        let restored = std::fs::read_to_string(lib.dir().join("task.py")).unwrap();
        assert_eq!(restored, SOURCE);
        assert!(!lib.dir().join(".task.py.prev").exists());
        assert!(!lib.dir().join(".task.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_overwrites_same_stem() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        lib.save("task", "def main():\n    return 1\n", &[]).await.unwrap();
        lib.save("task", "def main():\n    return 2\n", &["x".into()]).await.unwrap();

        let entry = lib.get("task").await.unwrap();
        assert!(entry.source.contains("return 2"));
        assert!(!lib.dir().join(".task.py.prev").exists());
        assert_eq!(lib.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_both_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        lib.save("task", SOURCE, &[]).await.unwrap();

        let outcome = lib.remove("task").await.unwrap();
        assert!(outcome.source_removed && outcome.metadata_removed);
        assert!(!lib.dir().join("task.py").exists());
        assert!(!lib.dir().join("task.json").exists());
    }

    #[tokio::test]
    async fn remove_without_metadata_still_removes_source() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        std::fs::create_dir_all(lib.dir()).unwrap();
        std::fs::write(lib.dir().join("orphan.py"), SOURCE).unwrap();

        let outcome = lib.remove("orphan").await.unwrap();
        assert_eq!(
            outcome,
            RemoveOutcome {
                source_removed: true,
                metadata_removed: false
            }
        );
        assert!(!lib.dir().join("orphan.py").exists());
    }

    #[tokio::test]
    async fn remove_unknown_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        assert!(matches!(
            lib.remove("nothing").await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn read_source_reports_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let lib = store(tmp.path());
        assert!(matches!(
            lib.read_source("nothing").await,
            Err(LibraryError::NotFound(_))
        ));
    }
}
