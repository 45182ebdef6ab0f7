use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::RoomError;

/// Durable record of which room identifiers exist.
///
/// The room engine only ever asks `exists`; rooms are created through the HTTP API.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Create a room and return its freshly generated identifier.
    async fn create(&self) -> Result<String, RoomError>;

    /// Whether `room_id` was created earlier.
    async fn exists(&self, room_id: &str) -> Result<bool, RoomError>;

    /// Short backend name for logs and diagnostics
    fn backend(&self) -> &'static str;
}

/// Room Row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Postgres-backed room directory
pub struct PgRoomDirectory {
    pool: PgPool,
}

impl PgRoomDirectory {
    /// Connect to the database and make sure the `rooms` table exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Database connection pool created successfully");
        Ok(Self { pool })
    }

    /// Fetch a room row by id
    pub async fn get_room(&self, room_id: &str) -> Result<Option<RoomRow>, SqlxError> {
        sqlx::query_as::<_, RoomRow>("SELECT id, created_at FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl RoomDirectory for PgRoomDirectory {
    async fn create(&self) -> Result<String, RoomError> {
        let room_id = Uuid::new_v4().to_string();
        let row = sqlx::query_as::<_, RoomRow>(
            "INSERT INTO rooms (id) VALUES ($1) RETURNING id, created_at",
        )
        .bind(&room_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert room '{}': {}", room_id, e);
            e
        })?;

        info!("Room '{}' created at {}", row.id, row.created_at);
        Ok(row.id)
    }

    async fn exists(&self, room_id: &str) -> Result<bool, RoomError> {
        let row = self.get_room(room_id).await.map_err(|e| {
            error!("Failed to look up room '{}': {}", room_id, e);
            e
        })?;
        Ok(row.is_some())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// Process-local room directory, used when no database is configured
#[derive(Default)]
pub struct MemoryRoomDirectory {
    rooms: RwLock<HashSet<String>>,
}

impl MemoryRoomDirectory {
    /// Register an existing identifier
    pub fn insert(&self, room_id: &str) {
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room_id.to_string());
    }
}

#[async_trait]
impl RoomDirectory for MemoryRoomDirectory {
    async fn create(&self) -> Result<String, RoomError> {
        let room_id = Uuid::new_v4().to_string();
        self.insert(&room_id);
        debug!("Room '{}' created in memory", room_id);
        Ok(room_id)
    }

    async fn exists(&self, room_id: &str) -> Result<bool, RoomError> {
        Ok(self
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(room_id))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_rooms_exist() {
        let directory = MemoryRoomDirectory::default();
        let id = directory.create().await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(directory.exists(&id).await.unwrap());
        assert!(!directory.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let directory = MemoryRoomDirectory::default();
        let a = directory.create().await.unwrap();
        let b = directory.create().await.unwrap();
        assert_ne!(a, b);
    }
}
