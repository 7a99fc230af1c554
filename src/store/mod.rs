//! Local document store: one JSON file per record, indexed in memory.
//!
//! Records live under `DATA_DIR/documents/<id>.json`. The directory is scanned once when the
//! store opens; afterwards the in-memory map is authoritative and every mutation is written
//! through to disk (temp file + rename) while the write lock is held.

use crate::document::DocumentRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use walkdir::WalkDir;

/// Errors raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("Store I/O failed for {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Record could not be serialized.
    #[error("Failed to serialize document record: {0}")]
    Serialize(#[from] serde_json::Error),
    /// No record with this id.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Id is not usable as a file name.
    #[error("Invalid document id: {0}")]
    InvalidId(String),
    /// Background load task failed.
    #[error("Store load task failed: {0}")]
    Task(String),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// JSON-file document store with an in-memory index.
pub struct DocumentStore {
    dir: PathBuf,
    records: RwLock<HashMap<String, DocumentRecord>>,
}

impl DocumentStore {
    /// Open (creating if needed) the store rooted at `dir` and load existing records.
    ///
    /// Unreadable or malformed files are logged and skipped.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(io_error(&dir))?;

        let scan_dir = dir.clone();
        let records = tokio::task::spawn_blocking(move || load_records(&scan_dir))
            .await
            .map_err(|error| StoreError::Task(error.to_string()))?;

        tracing::info!(path = %dir.display(), documents = records.len(), "Document store loaded");
        Ok(Self {
            dir,
            records: RwLock::new(records),
        })
    }

    /// Persist a new or replacement record.
    pub async fn insert(&self, record: DocumentRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        self.persist(&record).await?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// All records, newest upload first.
    pub async fn list(&self) -> Vec<DocumentRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            b.upload_timestamp
                .cmp(&a.upload_timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Apply `change` to a record and persist the result.
    ///
    /// The in-memory copy only changes once the write succeeded.
    pub async fn update<F>(&self, id: &str, change: F) -> Result<DocumentRecord, StoreError>
    where
        F: FnOnce(&mut DocumentRecord),
    {
        let mut records = self.records.write().await;
        let mut updated = records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        change(&mut updated);
        self.persist(&updated).await?;
        records.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    /// Delete a record, returning it when it existed.
    pub async fn remove(&self, id: &str) -> Result<Option<DocumentRecord>, StoreError> {
        let mut records = self.records.write().await;
        if !records.contains_key(id) {
            return Ok(None);
        }

        let path = self.record_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Record file already missing");
            }
            Err(error) => return Err(io_error(&path)(error)),
        }
        Ok(records.remove(id))
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn persist(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.id)?;
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&tmp, body).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(io_error(&path))?;
        tracing::debug!(document_id = %record.id, path = %path.display(), "Record persisted");
        Ok(())
    }
}

fn load_records(dir: &Path) -> HashMap<String, DocumentRecord> {
    let mut records = HashMap::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "json"))
    {
        let parsed = std::fs::read(entry.path())
            .map_err(|error| error.to_string())
            .and_then(|bytes| {
                serde_json::from_slice::<DocumentRecord>(&bytes).map_err(|error| error.to_string())
            });
        match parsed {
            Ok(record) => {
                records.insert(record.id.clone(), record);
            }
            Err(error) => {
                tracing::warn!(path = %entry.path().display(), error = %error, "Skipping unreadable record");
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentAnalysis, DocumentMetadata, DocumentType, FinancialTerms};
    use crate::extraction::FileKind;

    fn record(id: &str, uploaded: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.into(),
            filename: format!("{id}.txt"),
            file_path: format!("uploads/{id}.txt"),
            file_kind: FileKind::Txt,
            file_size: 10,
            file_hash: "hash".into(),
            upload_timestamp: uploaded.into(),
            text: "The tenant shall pay rent.".into(),
            metadata: DocumentMetadata::default(),
            analysis: DocumentAnalysis {
                document_type: DocumentType::Rental,
                risk_score: 0,
                overall_assessment: String::new(),
                summary: String::new(),
                simplified_text: String::new(),
                key_points: Vec::new(),
                jargon_definitions: Default::default(),
                risk_factors: Vec::new(),
                key_dates: Vec::new(),
                financial_terms: FinancialTerms::default(),
                created_at: uploaded.into(),
            },
            qa_history: Vec::new(),
            indexed: false,
        }
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::open(dir.path()).await.expect("open");
        store
            .insert(record("doc-a", "2024-01-01T00:00:00Z"))
            .await
            .expect("insert");
        store
            .insert(record("doc-b", "2024-02-01T00:00:00Z"))
            .await
            .expect("insert");
        drop(store);

        let reopened = DocumentStore::open(dir.path()).await.expect("reopen");
        assert_eq!(reopened.len().await, 2);
        let ids: Vec<_> = reopened.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["doc-b", "doc-a"]);
        assert!(!dir.path().join("doc-a.json.tmp").exists());
    }

    #[tokio::test]
    async fn update_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::open(dir.path()).await.expect("open");
        store
            .insert(record("doc-a", "2024-01-01T00:00:00Z"))
            .await
            .expect("insert");

        let updated = store
            .update("doc-a", |record| record.indexed = true)
            .await
            .expect("update");
        assert!(updated.indexed);
        assert!(store.get("doc-a").await.expect("record").indexed);

        assert!(matches!(
            store.update("missing", |_| {}).await,
            Err(StoreError::NotFound(id)) if id == "missing"
        ));

        let removed = store.remove("doc-a").await.expect("remove");
        assert!(removed.is_some());
        assert!(store.is_empty().await);
        assert!(!dir.path().join("doc-a.json").exists());
        assert!(store.remove("doc-a").await.expect("remove").is_none());
    }

    #[tokio::test]
    async fn malformed_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.json"), b"{not json").expect("write");
        std::fs::write(dir.path().join("notes.md"), b"ignored").expect("write");

        let store = DocumentStore::open(dir.path()).await.expect("open");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn rejects_unsafe_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::open(dir.path()).await.expect("open");
        let result = store.insert(record("../escape", "2024-01-01T00:00:00Z")).await;
        assert!(matches!(result, Err(StoreError::InvalidId(_))));
    }
}
