//! PostgreSQL storage backend for MarketSync.
//!
//! Persists transfer events and checkpoints to PostgreSQL with `sqlx`
//! connection pooling for production deployments.
//!
//! # Feature Flag
//! Requires the `postgres` feature:
//! ```toml
//! marketsync-storage = { version = "0.2", features = ["postgres"] }
//! ```
//!
//! # Schema
//! Created automatically on first connect:
//! - `marketsync_transfer_events` — normalized transfers, unique on
//!   (block_hash, tx_hash, log_index, kind)
//! - `marketsync_checkpoints` — orchestrator resume positions

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use marketsync_core::checkpoint::{CheckpointStore, SyncCheckpoint};
use marketsync_core::error::IngestError;
use marketsync_core::event::{TransferEvent, TransferEventKind};
use marketsync_core::parser::BaseEventParams;
use marketsync_core::store::EventStore;

// ─── Connection options ────────────────────────────────────────────────────────

/// Connection options for the Postgres storage backend.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    /// Maximum number of connections in the pool (default: 10)
    pub max_connections: u32,
    /// Minimum number of idle connections to keep open (default: 1)
    pub min_connections: u32,
    /// Connection timeout in seconds (default: 30)
    pub connect_timeout_secs: u64,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

// ─── PostgresStore ───────────────────────────────────────────────────────────

/// PostgreSQL-backed storage for transfer events and checkpoints.
///
/// Thread-safe and cheaply cloneable — wraps a connection pool internally.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to a PostgreSQL database and initialize the schema.
    ///
    /// The URL format follows libpq convention:
    /// `postgresql://[user[:password]@][host][:port][/dbname]`
    pub async fn connect(database_url: &str) -> Result<Self, IngestError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| IngestError::BatchWrite(format!("postgres connect: {e}")))?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("PostgresStore connected and schema initialized");
        Ok(store)
    }

    /// Connect with custom pool options.
    pub async fn connect_with_options(
        database_url: &str,
        opts: PostgresOptions,
    ) -> Result<Self, IngestError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(opts.max_connections)
            .min_connections(opts.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(opts.connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| IngestError::BatchWrite(format!("postgres connect: {e}")))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they don't already exist.
    async fn init_schema(&self) -> Result<(), IngestError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS marketsync_transfer_events (
                kind         TEXT    NOT NULL,
                token_id     TEXT    NOT NULL,
                from_address TEXT    NOT NULL,
                to_address   TEXT    NOT NULL,
                amount       NUMERIC(78, 0) NOT NULL,
                address      TEXT    NOT NULL,
                block_number BIGINT  NOT NULL,
                block_hash   TEXT    NOT NULL,
                tx_hash      TEXT    NOT NULL,
                tx_index     INTEGER NOT NULL,
                log_index    INTEGER NOT NULL,
                indexed_at   BIGINT  NOT NULL DEFAULT EXTRACT(EPOCH FROM NOW())::BIGINT,
                PRIMARY KEY (block_hash, tx_hash, log_index, kind)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        // Reorg retraction path
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_marketsync_transfers_block_hash
             ON marketsync_transfer_events(block_hash)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        // Query-layer access patterns
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_marketsync_transfers_address
             ON marketsync_transfer_events(address, block_number DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS marketsync_checkpoints (
                chain        TEXT   NOT NULL,
                registry_id  TEXT   NOT NULL,
                block_number BIGINT NOT NULL,
                block_hash   TEXT   NOT NULL,
                updated_at   BIGINT NOT NULL DEFAULT EXTRACT(EPOCH FROM NOW())::BIGINT,
                PRIMARY KEY (chain, registry_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        debug!("PostgresStore schema initialized");
        Ok(())
    }

    /// Get the underlying connection pool (for custom queries).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<TransferEvent, IngestError> {
        let kind = match row.get::<String, _>("kind").as_str() {
            "erc20" => TransferEventKind::Erc20,
            "erc721" => TransferEventKind::Erc721,
            "erc1155" => TransferEventKind::Erc1155,
            other => {
                return Err(IngestError::BatchWrite(format!(
                    "unknown stored event kind: {other}"
                )))
            }
        };
        Ok(TransferEvent {
            kind,
            token_id: row.get("token_id"),
            from: row.get("from_address"),
            to: row.get("to_address"),
            amount: row.get("amount"),
            base: BaseEventParams {
                address: row.get("address"),
                block_number: row.get::<i64, _>("block_number") as u64,
                block_hash: row.get("block_hash"),
                tx_hash: row.get("tx_hash"),
                tx_index: row.get::<i32, _>("tx_index") as u32,
                log_index: row.get::<i32, _>("log_index") as u32,
            },
        })
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn persist(&self, batch: &[TransferEvent]) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        for ev in batch {
            sqlx::query(
                "INSERT INTO marketsync_transfer_events
                    (kind, token_id, from_address, to_address, amount, address,
                     block_number, block_hash, tx_hash, tx_index, log_index)
                 VALUES ($1, $2, $3, $4, $5::NUMERIC, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (block_hash, tx_hash, log_index, kind)
                 DO UPDATE SET
                    token_id     = EXCLUDED.token_id,
                    from_address = EXCLUDED.from_address,
                    to_address   = EXCLUDED.to_address,
                    amount       = EXCLUDED.amount,
                    address      = EXCLUDED.address,
                    block_number = EXCLUDED.block_number,
                    tx_index     = EXCLUDED.tx_index,
                    indexed_at   = EXTRACT(EPOCH FROM NOW())::BIGINT",
            )
            .bind(ev.kind.as_str())
            .bind(&ev.token_id)
            .bind(&ev.from)
            .bind(&ev.to)
            .bind(&ev.amount)
            .bind(&ev.base.address)
            .bind(ev.base.block_number as i64)
            .bind(&ev.base.block_hash)
            .bind(&ev.base.tx_hash)
            .bind(ev.base.tx_index as i32)
            .bind(ev.base.log_index as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| IngestError::BatchWrite(format!("commit batch: {e}")))?;

        debug!(rows = batch.len(), "transfer batch committed");
        Ok(())
    }

    async fn remove_by_block_hash(&self, block_hash: &str) -> Result<u64, IngestError> {
        let result =
            sqlx::query("DELETE FROM marketsync_transfer_events WHERE block_hash = $1")
                .bind(block_hash)
                .execute(&self.pool)
                .await
                .map_err(|e| IngestError::Fix {
                    block_hash: block_hash.to_string(),
                    reason: e.to_string(),
                })?;

        debug!(block_hash, removed = result.rows_affected(), "retracted block");
        Ok(result.rows_affected())
    }

    async fn transfers_by_block_hash(
        &self,
        block_hash: &str,
    ) -> Result<Vec<TransferEvent>, IngestError> {
        let rows = sqlx::query(
            "SELECT kind, token_id, from_address, to_address, amount::TEXT as amount,
                    address, block_number, block_hash, tx_hash, tx_index, log_index
             FROM marketsync_transfer_events
             WHERE block_hash = $1
             ORDER BY block_number, tx_index, log_index",
        )
        .bind(block_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn transfer_count(&self) -> Result<u64, IngestError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM marketsync_transfer_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }
}

// ─── CheckpointStore impl ─────────────────────────────────────────────────────

#[async_trait]
impl CheckpointStore for PostgresStore {
    async fn load(
        &self,
        chain: &str,
        registry_id: &str,
    ) -> Result<Option<SyncCheckpoint>, IngestError> {
        let row = sqlx::query(
            "SELECT chain, registry_id, block_number, block_hash, updated_at
             FROM marketsync_checkpoints WHERE chain = $1 AND registry_id = $2",
        )
        .bind(chain)
        .bind(registry_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IngestError::Checkpoint(e.to_string()))?;

        Ok(row.map(|r| SyncCheckpoint {
            chain: r.get("chain"),
            registry_id: r.get("registry_id"),
            block_number: r.get::<i64, _>("block_number") as u64,
            block_hash: r.get("block_hash"),
            updated_at: r.get("updated_at"),
        }))
    }

    async fn save(&self, checkpoint: SyncCheckpoint) -> Result<(), IngestError> {
        sqlx::query(
            "INSERT INTO marketsync_checkpoints
                (chain, registry_id, block_number, block_hash, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (chain, registry_id)
             DO UPDATE SET
                block_number = EXCLUDED.block_number,
                block_hash   = EXCLUDED.block_hash,
                updated_at   = EXCLUDED.updated_at",
        )
        .bind(&checkpoint.chain)
        .bind(&checkpoint.registry_id)
        .bind(checkpoint.block_number as i64)
        .bind(&checkpoint.block_hash)
        .bind(checkpoint.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::Checkpoint(e.to_string()))?;

        debug!(
            chain = %checkpoint.chain,
            registry_id = %checkpoint.registry_id,
            block = checkpoint.block_number,
            "checkpoint saved"
        );
        Ok(())
    }

    async fn delete(&self, chain: &str, registry_id: &str) -> Result<(), IngestError> {
        sqlx::query(
            "DELETE FROM marketsync_checkpoints WHERE chain = $1 AND registry_id = $2",
        )
        .bind(chain)
        .bind(registry_id)
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::Checkpoint(e.to_string()))?;

        Ok(())
    }
}
