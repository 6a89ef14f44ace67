use chrono::Utc;
use log::info;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_rusqlite::Connection;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("Database connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub user_role: String,
    pub question: String,
    pub status: String,
}

/// SQLite audit trail of every question asked through the API.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn).await
    }

    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let db = Self { conn: Arc::new(conn) };
        db.initialize().await?;
        Ok(db)
    }

    async fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS audit_log (
                        id INTEGER PRIMARY KEY,
                        timestamp TEXT NOT NULL,
                        user_role TEXT NOT NULL,
                        question TEXT NOT NULL,
                        status TEXT NOT NULL
                    );",
                )
            })
            .await?;

        info!("Audit database initialized successfully");
        Ok(())
    }

    pub async fn record_query(
        &self,
        user_role: &str,
        question: &str,
        status: &str,
    ) -> Result<(), DatabaseError> {
        let timestamp = Utc::now().to_rfc3339();
        let user_role = user_role.to_string();
        let question = question.to_string();
        let status = status.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO audit_log (timestamp, user_role, question, status) VALUES (?1, ?2, ?3, ?4)",
                    [&timestamp, &user_role, &question, &status],
                )
            })
            .await?;

        Ok(())
    }

    /// Most recent entries first.
    pub async fn recent_queries(&self, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
        let result = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT timestamp, user_role, question, status
                     FROM audit_log
                     ORDER BY id DESC
                     LIMIT ?",
                )?;

                let rows = stmt.query_map([limit], |row| {
                    Ok(AuditEntry {
                        timestamp: row.get::<_, String>(0)?,
                        user_role: row.get::<_, String>(1)?,
                        question: row.get::<_, String>(2)?,
                        status: row.get::<_, String>(3)?,
                    })
                })?;

                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }

                Ok(entries)
            })
            .await?;

        Ok(result)
    }
}
