use crate::db::Db;
use crate::db::models::NewChunk;
use crate::indexer::{language, segmenter};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SyncResult {
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub added: usize,
    pub updated: usize,
}

pub struct Indexer {
    pub db: Arc<TokioMutex<Db>>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Stores paths with forward slashes so keys are stable across platforms.
fn storage_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl Indexer {
    pub fn new(db: Arc<TokioMutex<Db>>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            db,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Checks if a file extension is supported
    pub fn is_supported_extension(ext: &str) -> bool {
        matches!(ext.to_ascii_lowercase().as_str(), "md" | "txt")
    }

    /// Indexes all supported files in a directory with differential sync
    pub async fn index_directory<P: AsRef<Path>>(
        &self,
        dir: P,
        force: bool,
    ) -> Result<SyncResult, IndexError> {
        let dir = dir.as_ref();
        info!("Indexing directory: {}", dir.display());

        // filename -> modified_at
        let existing_docs = {
            let db_guard = self.db.lock().await;
            db_guard.list_documents()?
        };

        let mut result = SyncResult::default();

        // Walk builder respects .gitignore by default
        let walker = WalkBuilder::new(dir).hidden(false).build();

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if !Self::is_supported_extension(ext) {
                continue;
            }

            let key = storage_key(path);
            let metadata = entry.metadata().map_err(std::io::Error::other)?;
            let mod_time: DateTime<Utc> = metadata.modified()?.into();

            let is_update = match existing_docs.get(&key) {
                Some(existing) if !force && mod_time.timestamp() == existing.timestamp() => {
                    result.skipped += 1;
                    continue;
                }
                Some(_) => true,
                None => false,
            };

            match self.store_file(path, &key, mod_time).await {
                Ok(chunks) => {
                    debug!("Indexed {key}: {chunks} chunks");
                    result.indexed += 1;
                    if is_update {
                        result.updated += 1;
                    } else {
                        result.added += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to index {key}: {e}");
                    result.failed += 1;
                }
            }
        }

        info!(
            "Sync finished: {} indexed ({} added, {} updated), {} skipped, {} failed",
            result.indexed, result.added, result.updated, result.skipped, result.failed
        );
        Ok(result)
    }

    /// Indexes a single file regardless of its modification time.
    /// Returns the number of chunks stored.
    pub async fn index_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, IndexError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if !Self::is_supported_extension(ext) {
            return Err(IndexError::Unsupported(path.display().to_string()));
        }

        let mod_time: DateTime<Utc> = std::fs::metadata(path)?.modified()?.into();
        self.store_file(path, &storage_key(path), mod_time).await
    }

    async fn store_file(
        &self,
        real_path: &Path,
        key: &str,
        mod_time: DateTime<Utc>,
    ) -> Result<usize, IndexError> {
        let segments = segmenter::parse_file(real_path, self.chunk_size, self.chunk_overlap)?;

        let languages: Vec<&str> = segments
            .iter()
            .map(|s| language::detect_language(&s.content))
            .collect();
        let chunks: Vec<NewChunk<'_>> = segments
            .iter()
            .zip(&languages)
            .map(|(s, lang)| NewChunk {
                position: s.position,
                content: &s.content,
                language: lang,
                token_count: language::count_tokens(&s.content),
            })
            .collect();

        {
            let mut db_guard = self.db.lock().await;
            db_guard.insert_document(key, mod_time, &chunks)?;
        }

        Ok(chunks.len())
    }
}
