//! Database operations for quest tracking.

use crate::models::{Category, Quest, QuestId};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Result as SqlResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Quest not found: {0}")]
    NotFound(QuestId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Schema migrations, applied in order. `PRAGMA user_version` records how
/// many have run.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS quests (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        is_completed INTEGER NOT NULL DEFAULT 0,
        category TEXT NOT NULL,
        document_path TEXT,
        completion_date TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_quests_completion ON quests(completion_date);
    "#,
];

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create database at path.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let mut db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    /// Bring the schema up to the latest version.
    fn migrate(&mut self) -> DbResult<()> {
        let current: usize = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))?
            as usize;

        if current >= MIGRATIONS.len() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        for (version, sql) in MIGRATIONS.iter().enumerate().skip(current) {
            tx.execute_batch(sql)?;
            tracing::info!(version = version + 1, "applied schema migration");
        }
        tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)?;
        tx.commit()?;
        Ok(())
    }

    /// Current schema version.
    pub fn schema_version(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Insert a new quest.
    pub fn insert_quest(&self, quest: &Quest) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO quests (id, title, is_completed, category, document_path,
                                completion_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                quest.id.to_string(),
                quest.title,
                quest.is_completed() as i32,
                quest.category.as_str(),
                quest.document.as_ref().map(|p| p.to_string_lossy().into_owned()),
                quest.completion_date.map(|d| d.to_rfc3339()),
                quest.created_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(id = %quest.id, title = %quest.title, "inserted quest");
        Ok(())
    }

    /// Update every mutable field of an existing quest.
    pub fn update_quest(&self, quest: &Quest) -> DbResult<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE quests SET
                title = ?2, is_completed = ?3, category = ?4,
                document_path = ?5, completion_date = ?6
            WHERE id = ?1
            "#,
            params![
                quest.id.to_string(),
                quest.title,
                quest.is_completed() as i32,
                quest.category.as_str(),
                quest.document.as_ref().map(|p| p.to_string_lossy().into_owned()),
                quest.completion_date.map(|d| d.to_rfc3339()),
            ],
        )?;

        if changed == 0 {
            return Err(DbError::NotFound(quest.id));
        }
        Ok(())
    }

    /// Set or clear the completion date. The flag follows the date in the
    /// same statement.
    pub fn set_completion(&self, id: QuestId, at: Option<DateTime<Utc>>) -> DbResult<()> {
        let changed = self.conn.execute(
            "UPDATE quests SET is_completed = ?2, completion_date = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                at.is_some() as i32,
                at.map(|d| d.to_rfc3339()),
            ],
        )?;

        if changed == 0 {
            return Err(DbError::NotFound(id));
        }
        Ok(())
    }

    /// Delete a quest. Returns whether a row was removed.
    pub fn delete_quest(&self, id: QuestId) -> DbResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM quests WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    /// Get a quest by ID.
    pub fn get_quest(&self, id: QuestId) -> DbResult<Option<Quest>> {
        let quest = self
            .conn
            .query_row(
                "SELECT * FROM quests WHERE id = ?1",
                params![id.to_string()],
                parse_quest_row,
            )
            .optional()?;
        Ok(quest)
    }

    /// List all quests in creation order.
    pub fn list_quests(&self) -> DbResult<Vec<Quest>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM quests ORDER BY created_at, id")?;
        let quests = stmt
            .query_map([], parse_quest_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(quests)
    }

    /// Delete every quest. Returns the number of rows removed.
    pub fn empty(&self) -> DbResult<usize> {
        let removed = self.conn.execute("DELETE FROM quests", [])?;
        tracing::info!(removed, "emptied quest database");
        Ok(removed)
    }

    /// Close the connection and delete the database file.
    pub fn destroy(self) -> DbResult<()> {
        let path = self.path.clone();
        self.conn.close().map_err(|(_, e)| DbError::Sqlite(e))?;

        if let Some(path) = path {
            std::fs::remove_file(&path)?;
            tracing::warn!(path = %path.display(), "deleted quest database file");
        }
        Ok(())
    }

    /// Number of completed quests per category.
    pub fn completed_count_by_category(&self) -> DbResult<HashMap<Category, u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM quests WHERE is_completed = 1 GROUP BY category",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (category, count) = row?;
            *counts.entry(Category::from_str_lossy(&category)).or_insert(0) += count as u32;
        }
        Ok(counts)
    }

    /// Completions per local day, for days in `start..=end`.
    pub fn completions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<BTreeMap<NaiveDate, u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT completion_date FROM quests WHERE completion_date IS NOT NULL")?;

        let mut counts = BTreeMap::new();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            let Some(at) = parse_timestamp(&row?) else {
                continue;
            };
            let day = at.with_timezone(&Local).date_naive();
            if day >= start && day <= end {
                *counts.entry(day).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

// Helper functions

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_quest_row(row: &rusqlite::Row) -> SqlResult<Quest> {
    let id_str: String = row.get("id")?;
    let category: String = row.get("category")?;
    let document: Option<String> = row.get("document_path")?;
    let is_completed: i32 = row.get("is_completed")?;
    let completion_str: Option<String> = row.get("completion_date")?;
    let created_str: String = row.get("created_at")?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    // A completed row without a readable date still counts as completed.
    let completion_date = match completion_str.as_deref().and_then(parse_timestamp) {
        Some(at) => Some(at),
        None if is_completed != 0 => Some(parse_timestamp(&created_str).unwrap_or_else(Utc::now)),
        None => None,
    };

    Ok(Quest {
        id,
        title: row.get("title")?,
        category: Category::from_str_lossy(&category),
        document: document.map(PathBuf::from),
        completion_date,
        created_at: parse_timestamp(&created_str).unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_insert_and_list_quests() {
        let db = Database::in_memory().unwrap();

        let mut quest = Quest::new("Write report", Category::Work);
        quest.document = Some(PathBuf::from("/tmp/report.png"));
        db.insert_quest(&quest).unwrap();

        let quests = db.list_quests().unwrap();
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].id, quest.id);
        assert_eq!(quests[0].title, "Write report");
        assert_eq!(quests[0].category, Category::Work);
        assert_eq!(quests[0].document, quest.document);
        assert!(!quests[0].is_completed());
    }

    #[test]
    fn test_title_with_quotes_round_trips() {
        let db = Database::in_memory().unwrap();

        let quest = Quest::new("Fix Bob's 'quoted'; DROP TABLE quests; --", Category::Dev);
        db.insert_quest(&quest).unwrap();

        let loaded = db.get_quest(quest.id).unwrap().unwrap();
        assert_eq!(loaded.title, quest.title);
        assert_eq!(db.list_quests().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_leaves_others() {
        let db = Database::in_memory().unwrap();

        let a = Quest::new("A", Category::Study);
        let b = Quest::new("B", Category::Dev);
        db.insert_quest(&a).unwrap();
        db.insert_quest(&b).unwrap();

        assert!(db.delete_quest(a.id).unwrap());
        assert!(!db.delete_quest(a.id).unwrap());

        let quests = db.list_quests().unwrap();
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].id, b.id);
    }

    #[test]
    fn test_update_completion_visible_in_get() {
        let db = Database::in_memory().unwrap();

        let quest = Quest::new("Run 5k", Category::Health);
        db.insert_quest(&quest).unwrap();

        let now = Utc::now();
        db.set_completion(quest.id, Some(now)).unwrap();

        let loaded = db.get_quest(quest.id).unwrap().unwrap();
        assert!(loaded.is_completed());
        assert_eq!(
            loaded.completion_date.map(|d| d.timestamp()),
            Some(now.timestamp())
        );

        db.set_completion(quest.id, None).unwrap();
        let loaded = db.get_quest(quest.id).unwrap().unwrap();
        assert!(!loaded.is_completed());
    }

    #[test]
    fn test_update_quest_fields() {
        let db = Database::in_memory().unwrap();

        let mut quest = Quest::new("Draft", Category::Study);
        db.insert_quest(&quest).unwrap();

        quest.title = "Final".to_string();
        quest.category = Category::Home;
        db.update_quest(&quest).unwrap();

        let loaded = db.get_quest(quest.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Final");
        assert_eq!(loaded.category, Category::Home);
    }

    #[test]
    fn test_update_missing_quest_is_not_found() {
        let db = Database::in_memory().unwrap();
        let quest = Quest::new("Ghost", Category::Study);

        assert!(matches!(db.update_quest(&quest), Err(DbError::NotFound(_))));
        assert!(matches!(
            db.set_completion(quest.id, Some(Utc::now())),
            Err(DbError::NotFound(_))
        ));
        assert!(db.get_quest(quest.id).unwrap().is_none());
    }

    #[test]
    fn test_empty_database() {
        let db = Database::in_memory().unwrap();
        for title in ["a", "b", "c"] {
            db.insert_quest(&Quest::new(title, Category::Dev)).unwrap();
        }

        assert_eq!(db.empty().unwrap(), 3);
        assert!(db.list_quests().unwrap().is_empty());
    }

    #[test]
    fn test_destroy_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quests.db");

        let db = Database::open(&path).unwrap();
        db.insert_quest(&Quest::new("Temp", Category::Dev)).unwrap();
        assert!(path.exists());

        db.destroy().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quests.db");

        let db = Database::open(&path).unwrap();
        let quest = Quest::new("Persist me", Category::Study);
        db.insert_quest(&quest).unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), MIGRATIONS.len() as i64);
        assert_eq!(db.get_quest(quest.id).unwrap().unwrap().title, "Persist me");
    }

    #[test]
    fn test_completed_count_by_category() {
        let db = Database::in_memory().unwrap();

        for (title, category, done) in [
            ("a", Category::Study, true),
            ("b", Category::Study, true),
            ("c", Category::Dev, true),
            ("d", Category::Dev, false),
        ] {
            let mut quest = Quest::new(title, category);
            if done {
                quest.complete(Utc::now());
            }
            db.insert_quest(&quest).unwrap();
        }

        let counts = db.completed_count_by_category().unwrap();
        assert_eq!(counts.get(&Category::Study), Some(&2));
        assert_eq!(counts.get(&Category::Dev), Some(&1));
        assert_eq!(counts.get(&Category::Work), None);
    }

    #[test]
    fn test_completions_between() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();

        for offset in [0, 0, 2, 40] {
            let mut quest = Quest::new("q", Category::Dev);
            quest.complete(now - Duration::days(offset));
            db.insert_quest(&quest).unwrap();
        }
        db.insert_quest(&Quest::new("open", Category::Dev)).unwrap();

        let today = now.with_timezone(&Local).date_naive();
        let counts = db
            .completions_between(today - Duration::days(7), today)
            .unwrap();

        assert_eq!(counts.get(&today), Some(&2));
        assert_eq!(counts.values().sum::<u32>(), 3);
    }
}
