use super::{Db, models::*};
use chrono::Utc;
use rusqlite::{OptionalExtension, Result, params};

/// Title length stored for a new thread (chars of its first question).
const TITLE_CHARS: usize = 80;

impl Db {
    pub fn create_thread(&self, id: &str, title: &str) -> Result<()> {
        let title: String = title.chars().take(TITLE_CHARS).collect();
        self.conn.execute(
            "INSERT OR IGNORE INTO threads (id, title, created_at) VALUES (?, ?, ?)",
            params![id, title, Utc::now()],
        )?;
        Ok(())
    }

    pub fn thread_exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM threads WHERE id = ?", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn insert_message(&self, msg: &NewMessage<'_>) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO messages (id, thread_id, role, content, language, tokens, latency_ms, model, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                msg.id,
                msg.thread_id,
                msg.role.as_str(),
                msg.content,
                msg.language,
                msg.tokens as i64,
                msg.latency_ms.map(|ms| ms as i64),
                msg.model,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    /// Messages of a thread in insertion order.
    pub fn thread_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, role, content, language, tokens, latency_ms, model, created_at
            FROM messages
            WHERE thread_id = ?
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map(params![thread_id], |row| {
            let role: String = row.get(1)?;
            Ok(Message {
                id: row.get(0)?,
                role: Role::parse(&role).unwrap_or(Role::User),
                content: row.get(2)?,
                language: row.get(3)?,
                tokens: row.get::<_, i64>(4)? as usize,
                latency_ms: row.get::<_, Option<i64>>(5)?.map(|ms| ms as u64),
                model: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        rows.collect()
    }

    /// Remembered turns of a thread, oldest first. Unreadable JSON counts as empty.
    pub fn load_key_facts(&self, thread_id: &str) -> Result<Vec<KeyFact>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT key_facts FROM thread_memory WHERE thread_id = ?",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default())
    }

    pub fn save_key_facts(&self, thread_id: &str, summary: &str, facts: &[KeyFact]) -> Result<()> {
        let json = serde_json::to_string(facts)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            r#"
            INSERT INTO thread_memory (thread_id, summary, key_facts, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(thread_id) DO UPDATE SET
                summary = excluded.summary,
                key_facts = excluded.key_facts,
                last_updated = excluded.last_updated
            "#,
            params![thread_id, summary, json, Utc::now()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message<'a>(id: &'a str, role: Role, content: &'a str) -> NewMessage<'a> {
        NewMessage {
            id,
            thread_id: "t1",
            role,
            content,
            language: "ar",
            tokens: content.split_whitespace().count(),
            latency_ms: None,
            model: None,
        }
    }

    #[test]
    fn test_threads_and_messages() {
        let db = Db::open_in_memory().unwrap();
        assert!(!db.thread_exists("t1").unwrap());

        db.create_thread("t1", &"س".repeat(200)).unwrap();
        assert!(db.thread_exists("t1").unwrap());
        // Creating twice is a no-op.
        db.create_thread("t1", "other").unwrap();

        let title: String = db
            .conn
            .query_row("SELECT title FROM threads WHERE id = 't1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(title.chars().count(), 80);

        db.insert_message(&message("m1", Role::User, "ما هو؟")).unwrap();
        let mut reply = message("m2", Role::Assistant, "جواب");
        reply.latency_ms = Some(12);
        reply.model = Some("local-rag-v1");
        db.insert_message(&reply).unwrap();

        let messages = db.thread_messages("t1").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].model.as_deref(), Some("local-rag-v1"));
        assert_eq!(messages[1].latency_ms, Some(12));
    }

    #[test]
    fn test_message_requires_thread() {
        let db = Db::open_in_memory().unwrap();
        assert!(db.insert_message(&message("m1", Role::User, "x")).is_err());
    }

    #[test]
    fn test_key_facts_roundtrip_and_overwrite() {
        let db = Db::open_in_memory().unwrap();
        db.create_thread("t1", "title").unwrap();
        assert!(db.load_key_facts("t1").unwrap().is_empty());

        let facts = vec![KeyFact {
            q: "سؤال".into(),
            a: "جواب".into(),
        }];
        db.save_key_facts("t1", "آخر سؤال: سؤال", &facts).unwrap();
        assert_eq!(db.load_key_facts("t1").unwrap(), facts);

        db.save_key_facts("t1", "s", &[]).unwrap();
        assert!(db.load_key_facts("t1").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_key_facts_ignored() {
        let db = Db::open_in_memory().unwrap();
        db.create_thread("t1", "title").unwrap();
        db.conn
            .execute(
                "INSERT INTO thread_memory (thread_id, key_facts, last_updated) VALUES ('t1', 'not json', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        assert!(db.load_key_facts("t1").unwrap().is_empty());
    }
}
