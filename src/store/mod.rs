//! SQLite persistence for uploaded documents and their pipeline status.
//!
//! A single `documents` table holds everything the pipeline produces: summary text, keyword
//! list, cluster assignment, topic terms, and the summary embedding. List-valued columns are
//! stored as JSON arrays (keywords, embedding) or a comma separated string (topics). The
//! connection runs in WAL mode behind a mutex so the service can share one store across tasks.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use serde::Serialize;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    owner           TEXT,
    title           TEXT NOT NULL,
    file_path       TEXT NOT NULL,
    content_hash    TEXT NOT NULL,
    summary         TEXT,
    summary_status  TEXT NOT NULL DEFAULT 'pending',
    status_detail   TEXT,
    keywords        TEXT NOT NULL DEFAULT '[]',
    cluster_id      INTEGER,
    topics          TEXT,
    embedding       TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner);
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(summary_status);
";

const SELECT_COLUMNS: &str = "id, owner, title, file_path, content_hash, summary, summary_status, \
     status_detail, keywords, cluster_id, topics, embedding, created_at, updated_at";

/// Errors raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite rejected a statement or the connection failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The database directory could not be created.
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    /// A list column could not be encoded.
    #[error("Failed to encode column value: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The current time could not be rendered as RFC 3339.
    #[error("Failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Lifecycle of a document's summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Uploaded, not yet summarized.
    Pending,
    /// Summarization in progress.
    Processing,
    /// Summary and keywords stored.
    Done,
    /// Extraction or summarization failed; see `status_detail`.
    Error,
}

impl SummaryStatus {
    /// Lowercase label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown summary status '{other}'")),
        }
    }
}

/// A stored document row.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    /// Primary key.
    pub id: i64,
    /// Uploading user, when known.
    pub owner: Option<String>,
    /// Original file name.
    pub title: String,
    /// Location of the stored upload.
    pub file_path: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub content_hash: String,
    /// Latest summary text.
    pub summary: Option<String>,
    /// Summary lifecycle state.
    pub summary_status: SummaryStatus,
    /// Error detail recorded alongside the `error` status.
    pub status_detail: Option<String>,
    /// Keywords extracted from the document text.
    pub keywords: Vec<String>,
    /// Cluster assigned by the last clustering run.
    pub cluster_id: Option<i64>,
    /// Label terms of the assigned cluster.
    pub topics: Vec<String>,
    /// Summary embedding used for clustering and similarity.
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

impl DocumentRecord {
    /// Whether a non-empty summary is stored.
    pub fn has_summary(&self) -> bool {
        self.summary
            .as_deref()
            .is_some_and(|summary| !summary.trim().is_empty())
    }
}

/// Fields supplied when registering a new upload.
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// Uploading user, when known.
    pub owner: Option<String>,
    /// Original file name.
    pub title: String,
    /// Location of the stored upload.
    pub file_path: String,
    /// Hex SHA-256 of the uploaded bytes.
    pub content_hash: String,
}

/// SQLite-backed document store.
pub struct DocumentStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl DocumentStore {
    /// Open or create the database at `path`, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        let store = Self {
            conn: Mutex::new(conn),
            path,
        };
        tracing::info!(
            path = %store.path.display(),
            documents = store.count_documents()?,
            "Document store ready"
        );
        Ok(store)
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored documents.
    pub fn count_documents(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert a `pending` document and return the stored row.
    pub fn insert_document(&self, document: NewDocument) -> Result<DocumentRecord, StoreError> {
        let now = now_rfc3339()?;
        let id = {
            let conn = self.conn.lock();
            conn.prepare_cached(
                "INSERT INTO documents (owner, title, file_path, content_hash, summary_status, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            )?
            .insert(params![
                document.owner,
                document.title,
                document.file_path,
                document.content_hash,
                SummaryStatus::Pending.as_str(),
                now
            ])?
        };

        Ok(DocumentRecord {
            id,
            owner: document.owner,
            title: document.title,
            file_path: document.file_path,
            content_hash: document.content_hash,
            summary: None,
            summary_status: SummaryStatus::Pending,
            status_detail: None,
            keywords: Vec::new(),
            cluster_id: None,
            topics: Vec::new(),
            embedding: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch a document by id.
    pub fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>, StoreError> {
        let conn = self.conn.lock();
        let record = conn
            .prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM documents WHERE id = ?1"
            ))?
            .query_row(params![id], row_to_record)
            .optional()?;
        Ok(record)
    }

    /// List documents newest first, optionally restricted to one owner.
    pub fn list_documents(&self, owner: Option<&str>) -> Result<Vec<DocumentRecord>, StoreError> {
        let conn = self.conn.lock();
        let records = match owner {
            Some(owner) => conn
                .prepare_cached(&format!(
                    "SELECT {SELECT_COLUMNS} FROM documents WHERE owner = ?1 \
                     ORDER BY created_at DESC, id DESC"
                ))?
                .query_map(params![owner], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?,
            None => conn
                .prepare_cached(&format!(
                    "SELECT {SELECT_COLUMNS} FROM documents ORDER BY created_at DESC, id DESC"
                ))?
                .query_map([], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(records)
    }

    /// Delete a document, returning the removed row.
    pub fn delete_document(&self, id: i64) -> Result<Option<DocumentRecord>, StoreError> {
        let Some(record) = self.get_document(id)? else {
            return Ok(None);
        };
        let conn = self.conn.lock();
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(Some(record))
    }

    /// Number of rows whose upload lives at `file_path`.
    ///
    /// Identical uploads under the same name share one stored file.
    pub fn file_references(&self, file_path: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .prepare_cached("SELECT COUNT(*) FROM documents WHERE file_path = ?1")?
            .query_row(params![file_path], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Update the summary status. Returns `false` when the document does not exist.
    pub fn set_status(
        &self,
        id: i64,
        status: SummaryStatus,
        detail: Option<&str>,
    ) -> Result<bool, StoreError> {
        let now = now_rfc3339()?;
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE documents SET summary_status = ?1, status_detail = ?2, updated_at = ?3 \
             WHERE id = ?4",
            params![status.as_str(), detail, now, id],
        )?;
        Ok(changed > 0)
    }

    /// Store summary and keywords and mark the document `done`.
    pub fn save_summary(
        &self,
        id: i64,
        summary: &str,
        keywords: &[String],
    ) -> Result<bool, StoreError> {
        let now = now_rfc3339()?;
        let keywords = serde_json::to_string(keywords)?;
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE documents SET summary = ?1, keywords = ?2, summary_status = ?3, \
             status_detail = NULL, updated_at = ?4 WHERE id = ?5",
            params![summary, keywords, SummaryStatus::Done.as_str(), now, id],
        )?;
        Ok(changed > 0)
    }

    /// Store the summary embedding.
    pub fn save_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool, StoreError> {
        let now = now_rfc3339()?;
        let encoded = serde_json::to_string(embedding)?;
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE documents SET embedding = ?1, updated_at = ?2 WHERE id = ?3",
            params![encoded, now, id],
        )?;
        Ok(changed > 0)
    }

    /// Documents in `status` that carry a summary, ordered by id.
    pub fn summaries_with_status(
        &self,
        status: SummaryStatus,
    ) -> Result<Vec<DocumentRecord>, StoreError> {
        let conn = self.conn.lock();
        let records = conn
            .prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM documents WHERE summary_status = ?1 \
                 AND summary IS NOT NULL AND TRIM(summary) != '' ORDER BY id"
            ))?
            .query_map(params![status.as_str()], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Documents with a stored embedding, skipping `except`.
    pub fn embedded_documents(&self, except: Option<i64>) -> Result<Vec<DocumentRecord>, StoreError> {
        let conn = self.conn.lock();
        let records = conn
            .prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM documents WHERE embedding IS NOT NULL \
                 AND (?1 IS NULL OR id != ?1) ORDER BY id"
            ))?
            .query_map(params![except], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Record the cluster assignment and its label terms.
    pub fn assign_cluster(
        &self,
        id: i64,
        cluster_id: i64,
        topics: &[String],
    ) -> Result<bool, StoreError> {
        let now = now_rfc3339()?;
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE documents SET cluster_id = ?1, topics = ?2, updated_at = ?3 WHERE id = ?4",
            params![cluster_id, topics.join(","), now, id],
        )?;
        Ok(changed > 0)
    }
}

fn now_rfc3339() -> Result<String, StoreError> {
    Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let status: String = row.get(6)?;
    let summary_status = status.parse().map_err(|message: String| {
        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, message.into())
    })?;
    let keywords: String = row.get(8)?;
    let keywords = serde_json::from_str(&keywords)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, error.into()))?;
    let topics: Option<String> = row.get(10)?;
    let embedding: Option<String> = row.get(11)?;
    let embedding = embedding
        .map(|raw| serde_json::from_str::<Vec<f32>>(&raw))
        .transpose()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, error.into()))?;

    Ok(DocumentRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        file_path: row.get(3)?,
        content_hash: row.get(4)?,
        summary: row.get(5)?,
        summary_status,
        status_detail: row.get(7)?,
        keywords,
        cluster_id: row.get(9)?,
        topics: split_topics(topics.as_deref()),
        embedding,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn split_topics(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, DocumentStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DocumentStore::open(dir.path().join("nested/docs.db")).expect("store");
        (dir, store)
    }

    fn new_document(owner: Option<&str>, title: &str) -> NewDocument {
        NewDocument {
            owner: owner.map(str::to_string),
            title: title.into(),
            file_path: format!("uploads/{title}"),
            content_hash: "abc123".into(),
        }
    }

    #[test]
    fn inserted_documents_start_pending() {
        let (_dir, store) = open_store();
        let record = store
            .insert_document(new_document(Some("ana"), "report.pdf"))
            .expect("insert");

        let loaded = store.get_document(record.id).expect("get").expect("present");
        assert_eq!(loaded.summary_status, SummaryStatus::Pending);
        assert_eq!(loaded.owner.as_deref(), Some("ana"));
        assert!(loaded.keywords.is_empty());
        assert!(!loaded.has_summary());
        assert!(loaded.embedding.is_none());
    }

    #[test]
    fn list_filters_by_owner() {
        let (_dir, store) = open_store();
        store.insert_document(new_document(Some("ana"), "a.pdf")).expect("insert");
        store.insert_document(new_document(Some("ben"), "b.pdf")).expect("insert");
        store.insert_document(new_document(None, "c.pdf")).expect("insert");

        assert_eq!(store.list_documents(None).expect("list").len(), 3);
        let ana = store.list_documents(Some("ana")).expect("list");
        assert_eq!(ana.len(), 1);
        assert_eq!(ana[0].title, "a.pdf");
    }

    #[test]
    fn status_transitions_and_summary_round_trip() {
        let (_dir, store) = open_store();
        let id = store
            .insert_document(new_document(None, "a.docx"))
            .expect("insert")
            .id;

        assert!(store.set_status(id, SummaryStatus::Processing, None).expect("status"));
        assert!(
            store
                .set_status(id, SummaryStatus::Error, Some("no text"))
                .expect("status")
        );
        let failed = store.get_document(id).expect("get").expect("present");
        assert_eq!(failed.summary_status, SummaryStatus::Error);
        assert_eq!(failed.status_detail.as_deref(), Some("no text"));

        let keywords = vec!["contract".to_string(), "payment".to_string()];
        assert!(store.save_summary(id, "Short summary.", &keywords).expect("save"));
        let done = store.get_document(id).expect("get").expect("present");
        assert_eq!(done.summary_status, SummaryStatus::Done);
        assert_eq!(done.status_detail, None);
        assert_eq!(done.keywords, keywords);
        assert!(done.has_summary());
    }

    #[test]
    fn updates_on_missing_rows_report_false() {
        let (_dir, store) = open_store();
        assert!(!store.set_status(42, SummaryStatus::Done, None).expect("status"));
        assert!(!store.save_embedding(42, &[0.1, 0.2]).expect("embedding"));
        assert!(store.delete_document(42).expect("delete").is_none());
    }

    #[test]
    fn embeddings_and_clusters_are_persisted() {
        let (_dir, store) = open_store();
        let first = store.insert_document(new_document(None, "a.pdf")).expect("insert").id;
        let second = store.insert_document(new_document(None, "b.pdf")).expect("insert").id;
        store.insert_document(new_document(None, "c.pdf")).expect("insert");

        store.save_embedding(first, &[1.0, 0.0]).expect("embedding");
        store.save_embedding(second, &[0.0, 1.0]).expect("embedding");

        let all = store.embedded_documents(None).expect("embedded");
        assert_eq!(all.len(), 2);
        let others = store.embedded_documents(Some(first)).expect("embedded");
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, second);
        assert_eq!(others[0].embedding.as_deref(), Some(&[0.0, 1.0][..]));

        let topics = vec!["invoice".to_string(), "tax".to_string()];
        store.assign_cluster(first, 3, &topics).expect("cluster");
        let clustered = store.get_document(first).expect("get").expect("present");
        assert_eq!(clustered.cluster_id, Some(3));
        assert_eq!(clustered.topics, topics);
    }

    #[test]
    fn summaries_with_status_skips_blank_summaries() {
        let (_dir, store) = open_store();
        let first = store.insert_document(new_document(None, "a.pdf")).expect("insert").id;
        let second = store.insert_document(new_document(None, "b.pdf")).expect("insert").id;
        store.save_summary(first, "Real summary.", &[]).expect("save");
        store.save_summary(second, "   ", &[]).expect("save");

        let done = store.summaries_with_status(SummaryStatus::Done).expect("done");
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, first);
    }

    #[test]
    fn delete_returns_removed_row() {
        let (_dir, store) = open_store();
        let id = store.insert_document(new_document(None, "a.pdf")).expect("insert").id;

        let removed = store.delete_document(id).expect("delete").expect("row");
        assert_eq!(removed.title, "a.pdf");
        assert!(store.get_document(id).expect("get").is_none());
        assert_eq!(store.count_documents().expect("count"), 0);
    }

    #[test]
    fn shared_file_paths_are_counted() {
        let (_dir, store) = open_store();
        let first = store.insert_document(new_document(Some("alice"), "a.pdf")).expect("insert").id;
        store.insert_document(new_document(Some("bob"), "a.pdf")).expect("insert");
        assert_eq!(store.file_references("uploads/a.pdf").expect("count"), 2);

        store.delete_document(first).expect("delete");
        assert_eq!(store.file_references("uploads/a.pdf").expect("count"), 1);
        assert_eq!(store.file_references("uploads/missing.pdf").expect("count"), 0);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            SummaryStatus::Pending,
            SummaryStatus::Processing,
            SummaryStatus::Done,
            SummaryStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<SummaryStatus>(), Ok(status));
        }
        assert!("finished".parse::<SummaryStatus>().is_err());
    }
}
