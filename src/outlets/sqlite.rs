//! SQLite-backed outlet store.
//!
//! Outlet rows live in SQLite with their embedding as a little-endian `f32`
//! blob; similarity search is a brute-force cosine scan, which is plenty for
//! a corpus of a few dozen outlets.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::model::{Match, Outlet};
use super::store::OutletStore;
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::vector_math::{cosine_similarity, sort_descending};

const OUTLET_COLUMNS: &str = "name, address, operating_hours, waze_link, lat, lng";

// Column references on the right-hand side of SET see the pre-update row, so
// the embedding survives only when the canonical text is unchanged.
const UPSERT_SQL: &str = "INSERT INTO outlets (name, address, operating_hours, waze_link, lat, lng, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
     ON CONFLICT(address) DO UPDATE SET
        embedding = CASE
            WHEN outlets.name = excluded.name AND outlets.operating_hours = excluded.operating_hours
            THEN outlets.embedding
            ELSE NULL
        END,
        name = excluded.name,
        operating_hours = excluded.operating_hours,
        waze_link = excluded.waze_link,
        lat = excluded.lat,
        lng = excluded.lng,
        updated_at = excluded.updated_at";

pub struct SqliteOutletStore {
    pool: SqlitePool,
}

impl SqliteOutletStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS outlets (
                address TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                operating_hours TEXT NOT NULL DEFAULT '',
                waze_link TEXT NOT NULL DEFAULT '',
                lat REAL,
                lng REAL,
                embedding BLOB,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS outlet_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_outlet(row: &SqliteRow) -> Outlet {
        Outlet {
            name: row.get("name"),
            address: row.get("address"),
            operating_hours: row.get("operating_hours"),
            waze_link: row.get("waze_link"),
            lat: row.get("lat"),
            lng: row.get("lng"),
        }
    }

    async fn upsert_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        outlet: &Outlet,
    ) -> Result<(), ApiError> {
        let outlet = outlet.clone().normalized();
        sqlx::query(UPSERT_SQL)
            .bind(&outlet.name)
            .bind(&outlet.address)
            .bind(&outlet.operating_hours)
            .bind(&outlet.waze_link)
            .bind(outlet.lat)
            .bind(outlet.lng)
            .execute(&mut **tx)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }
}

#[async_trait]
impl OutletStore for SqliteOutletStore {
    async fn select_all(&self) -> Result<Vec<Outlet>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM outlets ORDER BY name, address",
            OUTLET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_outlet).collect())
    }

    async fn select_by_key(&self, address: &str) -> Result<Option<Outlet>, ApiError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM outlets WHERE address = ?1",
            OUTLET_COLUMNS
        ))
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.as_ref().map(Self::row_to_outlet))
    }

    async fn nearest_neighbors(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Match>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT address, embedding FROM outlets WHERE embedding IS NOT NULL")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut scored: Vec<(String, f32)> = rows
            .iter()
            .filter_map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                if bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&bytes);
                let score = cosine_similarity(query_embedding, &stored);
                (score >= threshold).then(|| (row.get::<String, _>("address"), score))
            })
            .collect();

        sort_descending(&mut scored);
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(address, score)| Match::new(address, score))
            .collect())
    }

    async fn upsert_by_key(&self, outlet: &Outlet) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::upsert_in_tx(&mut tx, outlet).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn upsert_batch(&self, outlets: &[Outlet]) -> Result<(), ApiError> {
        if outlets.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        for outlet in outlets {
            Self::upsert_in_tx(&mut tx, outlet).await?;
        }
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn set_embedding(&self, address: &str, embedding: &[f32]) -> Result<bool, ApiError> {
        let blob = Self::serialize_embedding(embedding);
        let result = sqlx::query("UPDATE outlets SET embedding = ?1 WHERE address = ?2")
            .bind(&blob)
            .bind(address)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outlets")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn count_embedded(&self) -> Result<usize, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM outlets WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn missing_embeddings(&self) -> Result<Vec<Outlet>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM outlets WHERE embedding IS NULL ORDER BY name, address",
            OUTLET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_outlet).collect())
    }

    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar("SELECT value FROM outlet_meta WHERE key = 'embedding_model'")
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn set_embedding_model(&self, model: &str) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT OR REPLACE INTO outlet_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(model)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;
        Ok(())
    }

    async fn clear_embeddings(&self) -> Result<(), ApiError> {
        sqlx::query("UPDATE outlets SET embedding = NULL")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }
}
