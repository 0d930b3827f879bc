use super::{Db, models::*};
use crate::retrieval::ContentChunk;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Result, Row, params, params_from_iter};
use std::collections::HashMap;
use tracing::debug;

fn content_chunk(row: &Row<'_>) -> Result<ContentChunk> {
    Ok(ContentChunk {
        id: row.get(0)?,
        content: row.get(1)?,
        language: row.get(2)?,
        token_count: row.get::<_, i64>(3)? as usize,
    })
}

/// Escapes LIKE wildcards so keywords match literally.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Db {
    /// Returns a map of filename -> modified_at for all indexed documents
    pub fn list_documents(&self) -> Result<HashMap<String, DateTime<Utc>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT filename, modified_at FROM documents")?;
        let rows = stmt.query_map([], |row| {
            let filename: String = row.get(0)?;
            let modified_at: DateTime<Utc> = row.get(1)?;
            Ok((filename, modified_at))
        })?;

        let mut docs = HashMap::new();
        for row in rows {
            let (filename, modified_at) = row?;
            docs.insert(filename, modified_at);
        }

        Ok(docs)
    }

    /// Documents with their chunk counts, ordered by filename.
    pub fn document_infos(&self) -> Result<Vec<DocumentInfo>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT d.filename, d.modified_at, d.indexed_at, COUNT(c.id)
            FROM documents d
            LEFT JOIN chunks c ON c.document_id = d.id
            GROUP BY d.id
            ORDER BY d.filename
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DocumentInfo {
                filename: row.get(0)?,
                modified_at: row.get(1)?,
                indexed_at: row.get(2)?,
                chunk_count: row.get::<_, i64>(3)? as usize,
            })
        })?;
        rows.collect()
    }

    /// Deletes a document and its associated chunks from the database
    pub fn delete_document(&self, filename: &str) -> Result<bool> {
        let doc_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM documents WHERE filename = ?",
                params![filename],
                |row| row.get(0),
            )
            .optional()?;

        match doc_id {
            // Cascade deletes chunks
            Some(doc_id) => {
                let rows = self
                    .conn
                    .execute("DELETE FROM documents WHERE id = ?", params![doc_id])?;
                Ok(rows > 0)
            }
            None => Ok(false),
        }
    }

    /// Inserts or replaces a document with its chunks
    pub fn insert_document(
        &mut self,
        filename: &str,
        modified_at: DateTime<Utc>,
        chunks: &[NewChunk<'_>],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        // Insert or update document and get the stable ID
        let doc_id: i64 = tx.query_row(
            r#"
            INSERT INTO documents (filename, modified_at, indexed_at)
            VALUES (?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                modified_at = excluded.modified_at,
                indexed_at = excluded.indexed_at
            RETURNING id
            "#,
            params![filename, modified_at, Utc::now()],
            |row| row.get(0),
        )?;

        // Re-indexing replaces every chunk
        tx.execute("DELETE FROM chunks WHERE document_id = ?", params![doc_id])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (document_id, position, content, language, token_count) VALUES (?, ?, ?, ?, ?)",
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    doc_id,
                    chunk.position as i64,
                    chunk.content,
                    chunk.language,
                    chunk.token_count as i64
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Coarse candidate filter: chunks whose content contains any keyword.
    pub fn search_chunks(&self, keywords: &[String], limit: usize) -> Result<Vec<ContentChunk>> {
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conditions = vec!["content LIKE ? ESCAPE '\\'"; keywords.len()].join(" OR ");
        let sql = format!(
            "SELECT id, content, language, token_count FROM chunks WHERE {conditions} ORDER BY id LIMIT {limit}"
        );
        let patterns: Vec<String> = keywords.iter().map(|k| like_pattern(k)).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(params_from_iter(patterns.iter()), content_chunk)?
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "search_chunks: {} keywords -> {} candidates",
            keywords.len(),
            chunks.len()
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk<'a>(position: usize, content: &'a str) -> NewChunk<'a> {
        NewChunk {
            position,
            content,
            language: "ar",
            token_count: content.split_whitespace().count(),
        }
    }

    fn count(db: &Db, table: &str) -> i64 {
        db.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_documents_crud() {
        let mut db = Db::open_in_memory().unwrap();
        let now = Utc::now();
        let filename = "faq.md";

        db.insert_document(filename, now, &[chunk(0, "مرحبا"), chunk(1, "عالم")])
            .unwrap();

        let docs = db.list_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs.contains_key(filename));
        assert_eq!(count(&db, "chunks"), 2);

        let infos = db.document_infos().unwrap();
        assert_eq!(infos[0].filename, filename);
        assert_eq!(infos[0].chunk_count, 2);

        // Re-index replaces the old chunks
        db.insert_document(filename, Utc::now(), &[chunk(0, "استبدال")])
            .unwrap();
        assert_eq!(count(&db, "chunks"), 1);
        assert_eq!(count(&db, "documents"), 1);

        assert!(db.delete_document(filename).unwrap());
        assert_eq!(count(&db, "chunks"), 0);
        assert!(!db.delete_document(filename).unwrap());
    }

    #[test]
    fn test_search_chunks_like_filter() {
        let mut db = Db::open_in_memory().unwrap();
        db.insert_document(
            "a.md",
            Utc::now(),
            &[
                chunk(0, "سؤال: ما هو الذكاء الاصطناعي؟ جواب: فرع من علوم الحاسوب"),
                chunk(1, "الطقس اليوم مشمس"),
                chunk(2, "Rust Ownership rules"),
            ],
        )
        .unwrap();

        let hits = db
            .search_chunks(&["ذكاء".to_string(), "ownership".to_string()], 50)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].content.contains("الذكاء"));
        assert_eq!(hits[0].language, "ar");
        assert!(hits[1].content.contains("Ownership"));

        let limited = db.search_chunks(&["ا".to_string()], 1).unwrap();
        assert_eq!(limited.len(), 1);

        assert!(db.search_chunks(&[], 50).unwrap().is_empty());
        assert_eq!(db.document_infos().unwrap()[0].chunk_count, 3);
    }

    #[test]
    fn test_search_chunks_wildcards_literal() {
        let mut db = Db::open_in_memory().unwrap();
        db.insert_document("a.md", Utc::now(), &[chunk(0, "discount 50% today"), chunk(1, "plain text")])
            .unwrap();

        let hits = db.search_chunks(&["%".to_string()], 50).unwrap();
        assert_eq!(hits.len(), 1);
        let hits = db.search_chunks(&["_".to_string()], 50).unwrap();
        assert!(hits.is_empty());
    }
}
