//! Database operations for chatdex.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::{Conversation, Message, MessageRole, SearchHit};
use crate::query::{self, SearchRequest};
use crate::schema::SCHEMA;

const FTS_CREATE: &str = r"
CREATE VIRTUAL TABLE messages_fts USING fts5(
    text,
    author_role,
    conversation_id,
    content=messages,
    content_rowid=rowid,
    tokenize = 'porter'
);
";

const FTS_TRIGGERS: &[&str] = &[
    r"
    CREATE TRIGGER messages_ai AFTER INSERT ON messages BEGIN
        INSERT INTO messages_fts(rowid, text, author_role, conversation_id)
        VALUES (NEW.rowid, NEW.text, NEW.author_role, NEW.conversation_id);
    END;
    ",
    r"
    CREATE TRIGGER messages_ad AFTER DELETE ON messages BEGIN
        INSERT INTO messages_fts(messages_fts, rowid, text, author_role, conversation_id)
        VALUES('delete', OLD.rowid, OLD.text, OLD.author_role, OLD.conversation_id);
    END;
    ",
    r"
    CREATE TRIGGER messages_au AFTER UPDATE ON messages BEGIN
        INSERT INTO messages_fts(messages_fts, rowid, text, author_role, conversation_id)
        VALUES('delete', OLD.rowid, OLD.text, OLD.author_role, OLD.conversation_id);
        INSERT INTO messages_fts(rowid, text, author_role, conversation_id)
        VALUES (NEW.rowid, NEW.text, NEW.author_role, NEW.conversation_id);
    END;
    ",
];

const FTS_TRIGGER_NAMES: &[&str] = &["messages_ai", "messages_ad", "messages_au"];

/// Database handle for chatdex.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        let parent = path.parent().unwrap_or(Path::new("."));
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// Initialize schema and the full-text index.
    async fn init(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        self.ensure_fts().await?;
        Ok(())
    }

    /// Close the database.
    pub async fn close(self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Ingestion writes
    // =========================================================================

    /// Write one conversation and its full message sequence in a single
    /// transaction. Any failure rolls the whole conversation back; a
    /// half-written conversation is never visible to readers.
    pub async fn ingest_conversation(
        &self,
        conv: &Conversation,
        messages: &[Message],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO conversations (id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                created_at = COALESCE(conversations.created_at, excluded.created_at),
                updated_at = excluded.updated_at
            ",
        )
        .bind(&conv.id)
        .bind(&conv.title)
        .bind(conv.created_at)
        .bind(conv.updated_at)
        .execute(&mut *tx)
        .await?;

        for msg in messages {
            // ON CONFLICT DO UPDATE, never INSERT OR REPLACE: REPLACE's
            // implicit delete skips the FTS delete trigger under default
            // recursive_triggers, leaving a stale index entry behind.
            sqlx::query(
                r"
                INSERT INTO messages (id, conversation_id, author_role, created_at, text)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    conversation_id = excluded.conversation_id,
                    author_role = excluded.author_role,
                    created_at = excluded.created_at,
                    text = excluded.text
                ",
            )
            .bind(&msg.id)
            .bind(&msg.conversation_id)
            .bind(msg.role.to_string())
            .bind(msg.created_at)
            .bind(&msg.text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a conversation by ID.
    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| conversation_from_row(&row)))
    }

    /// List conversations, most recently started first.
    pub async fn list_conversations(&self, limit: i64) -> Result<Vec<Conversation>> {
        let rows =
            sqlx::query(&format!(
                "SELECT * FROM conversations ORDER BY created_at DESC LIMIT {limit}"
            ))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(conversation_from_row).collect())
    }

    /// Get a conversation's messages in persisted chronological order.
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Get conversation count.
    pub async fn count_conversations(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Get message count.
    pub async fn count_messages(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Full-text search over message bodies, with optional inclusive date
    /// bounds. Results come back in message creation order; rows without
    /// a creation time sort first. Malformed match syntax surfaces as the
    /// engine's own error, untranslated.
    pub async fn search(&self, req: &SearchRequest) -> Result<Vec<SearchHit>> {
        let fts_query = query::translate(&req.query);

        let mut sql = String::from(
            r"
            SELECT
                m.id AS message_id,
                m.conversation_id AS conversation_id,
                c.title AS title,
                m.author_role AS author_role,
                m.created_at AS created_at,
                m.text AS text
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE 1=1
            ",
        );

        if !fts_query.trim().is_empty() {
            sql.push_str(
                " AND m.rowid IN (SELECT rowid FROM messages_fts WHERE messages_fts MATCH ?)",
            );
        }
        if req.since.is_some() {
            sql.push_str(" AND m.created_at >= ?");
        }
        if req.until.is_some() {
            sql.push_str(" AND m.created_at < ?");
        }

        sql.push_str(" ORDER BY m.created_at ASC");
        sql.push_str(&format!(" LIMIT {}", req.limit));

        let mut query_builder = sqlx::query(&sql);
        if !fts_query.trim().is_empty() {
            query_builder = query_builder.bind(fts_query);
        }
        if let Some(since) = req.since {
            query_builder = query_builder.bind(query::day_start(since));
        }
        if let Some(until) = req.until {
            query_builder = query_builder.bind(query::day_end(until));
        }

        let rows = query_builder.fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| SearchHit {
                message_id: row.get("message_id"),
                conversation_id: row.get("conversation_id"),
                title: row
                    .get::<Option<String>, _>("title")
                    .unwrap_or_default(),
                role: role_from_column(row.get::<Option<String>, _>("author_role")),
                created_at: row.get("created_at"),
                text: row.get::<Option<String>, _>("text").unwrap_or_default(),
            })
            .collect())
    }

    // =========================================================================
    // Full-text index maintenance
    // =========================================================================

    /// Create the index and its sync triggers when missing or declared
    /// with a stale schema, and backfill it when it is empty while the
    /// message store is not.
    async fn ensure_fts(&self) -> Result<()> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT sql FROM sqlite_master WHERE type='table' AND name = 'messages_fts'",
        )
        .fetch_optional(&self.pool)
        .await?;

        let schema_ok = existing
            .as_ref()
            .is_some_and(|(sql,)| sql.contains("content=messages") && sql.contains("porter"));

        if !schema_ok {
            self.rebuild_index().await?;
            return Ok(());
        }

        let messages: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        if messages.0 > 0 {
            let indexed: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages_fts")
                .fetch_one(&self.pool)
                .await?;
            if indexed.0 == 0 {
                sqlx::raw_sql("INSERT INTO messages_fts(messages_fts) VALUES('rebuild')")
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Drop and recreate the full-text index from the message store.
    /// O(total message count), unconditionally correct.
    pub async fn rebuild_index(&self) -> Result<()> {
        // Dedicated connection for the entire rebuild to avoid lock issues
        let mut conn = self.pool.acquire().await?;

        for trigger in FTS_TRIGGER_NAMES {
            let drop_sql = format!("DROP TRIGGER IF EXISTS {trigger}");
            sqlx::raw_sql(&drop_sql).execute(&mut *conn).await?;
        }

        sqlx::raw_sql("DROP TABLE IF EXISTS messages_fts")
            .execute(&mut *conn)
            .await?;

        sqlx::raw_sql(FTS_CREATE).execute(&mut *conn).await?;

        for sql in FTS_TRIGGERS {
            sqlx::raw_sql(sql).execute(&mut *conn).await?;
        }

        sqlx::raw_sql("INSERT INTO messages_fts(messages_fts) VALUES('rebuild')")
            .execute(&mut *conn)
            .await?;

        tracing::info!("Rebuilt full-text index");
        Ok(())
    }
}

fn conversation_from_row(row: &sqlx::sqlite::SqliteRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        title: row.get::<Option<String>, _>("title").unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        role: role_from_column(row.get::<Option<String>, _>("author_role")),
        created_at: row.get("created_at"),
        text: row.get::<Option<String>, _>("text").unwrap_or_default(),
    }
}

fn role_from_column(value: Option<String>) -> MessageRole {
    value
        .as_deref()
        .map_or(MessageRole::Other, MessageRole::from)
}
