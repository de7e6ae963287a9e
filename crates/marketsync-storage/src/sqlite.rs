//! SQLite storage backend for MarketSync.
//!
//! Persists transfer events and checkpoints to a single SQLite file.
//! Uses `sqlx` with WAL mode for concurrent read performance. Every sync
//! batch runs inside one transaction; the upsert key
//! (block_hash, tx_hash, log_index, kind) makes redelivery a no-op.
//!
//! # Usage
//! ```rust,no_run
//! use marketsync_storage::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStore::open("./marketsync.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use marketsync_core::checkpoint::{CheckpointStore, SyncCheckpoint};
use marketsync_core::error::IngestError;
use marketsync_core::event::{TransferEvent, TransferEventKind};
use marketsync_core::parser::BaseEventParams;
use marketsync_core::store::EventStore;

/// SQLite-backed storage for transfer events and checkpoints.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./marketsync.db"`) or a full
    /// SQLite URL (`"sqlite:./marketsync.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IngestError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database. All data is lost when the pool
    /// is dropped. Ideal for tests.
    pub async fn in_memory() -> Result<Self, IngestError> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and enable WAL mode.
    async fn init_schema(&self) -> Result<(), IngestError> {
        // WAL mode — better concurrent read throughput
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        // Transfer events, keyed by log identity + kind
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transfer_events (
                kind         TEXT    NOT NULL,
                token_id     TEXT    NOT NULL,
                from_address TEXT    NOT NULL,
                to_address   TEXT    NOT NULL,
                amount       TEXT    NOT NULL,
                address      TEXT    NOT NULL,
                block_number INTEGER NOT NULL,
                block_hash   TEXT    NOT NULL,
                tx_hash      TEXT    NOT NULL,
                tx_index     INTEGER NOT NULL,
                log_index    INTEGER NOT NULL,
                PRIMARY KEY (block_hash, tx_hash, log_index, kind)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        // Reorg retraction scans by block hash
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transfer_events_block_hash
             ON transfer_events (block_hash);",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        // Query-layer access patterns
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_transfer_events_address
             ON transfer_events (address, block_number);",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        // Checkpoint table
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                chain        TEXT    NOT NULL,
                registry_id  TEXT    NOT NULL,
                block_number INTEGER NOT NULL,
                block_hash   TEXT    NOT NULL,
                updated_at   INTEGER NOT NULL,
                PRIMARY KEY (chain, registry_id)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        Ok(())
    }

    fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<TransferEvent, IngestError> {
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
                tx_index: row.get::<i64, _>("tx_index") as u32,
                log_index: row.get::<i64, _>("log_index") as u32,
            },
        })
    }
}

#[async_trait]
impl EventStore for SqliteStore {
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
                "INSERT INTO transfer_events
                    (kind, token_id, from_address, to_address, amount, address,
                     block_number, block_hash, tx_hash, tx_index, log_index)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (block_hash, tx_hash, log_index, kind)
                 DO UPDATE SET
                    token_id     = excluded.token_id,
                    from_address = excluded.from_address,
                    to_address   = excluded.to_address,
                    amount       = excluded.amount,
                    address      = excluded.address,
                    block_number = excluded.block_number,
                    tx_index     = excluded.tx_index",
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
            .bind(ev.base.tx_index as i64)
            .bind(ev.base.log_index as i64)
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
        let result = sqlx::query("DELETE FROM transfer_events WHERE block_hash = ?")
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
            "SELECT kind, token_id, from_address, to_address, amount, address,
                    block_number, block_hash, tx_hash, tx_index, log_index
             FROM transfer_events
             WHERE block_hash = ?
             ORDER BY block_number, tx_index, log_index",
        )
        .bind(block_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn transfer_count(&self) -> Result<u64, IngestError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM transfer_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IngestError::BatchWrite(e.to_string()))?;

        let cnt: i64 = row.get("cnt");
        Ok(cnt as u64)
    }
}

// ─── CheckpointStore impl ────────────────────────────────────────────────────

#[async_trait]
impl CheckpointStore for SqliteStore {
    async fn load(
        &self,
        chain: &str,
        registry_id: &str,
    ) -> Result<Option<SyncCheckpoint>, IngestError> {
        let row = sqlx::query(
            "SELECT chain, registry_id, block_number, block_hash, updated_at
             FROM checkpoints WHERE chain = ? AND registry_id = ?",
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
            "INSERT OR REPLACE INTO checkpoints
             (chain, registry_id, block_number, block_hash, updated_at)
             VALUES (?, ?, ?, ?, ?)",
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
        sqlx::query("DELETE FROM checkpoints WHERE chain = ? AND registry_id = ?")
            .bind(chain)
            .bind(registry_id)
            .execute(&self.pool)
            .await
            .map_err(|e| IngestError::Checkpoint(e.to_string()))?;

        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use marketsync_core::event::TOKEN_ID_NONE;

    fn sample(block_hash: &str, tx_hash: &str, log_index: u32, amount: &str) -> TransferEvent {
        TransferEvent {
            kind: TransferEventKind::Erc20,
            token_id: TOKEN_ID_NONE.into(),
            from: "0x1111111111111111111111111111111111111111".into(),
            to: "0x2222222222222222222222222222222222222222".into(),
            amount: amount.into(),
            base: BaseEventParams {
                address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".into(),
                block_number: 100,
                block_hash: block_hash.into(),
                tx_hash: tx_hash.into(),
                tx_index: 3,
                log_index,
            },
        }
    }

    // ── Event persistence ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn batch_persist_and_read_back() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .persist(&[
                sample("0xaaa", "0xt1", 0, "100"),
                sample("0xaaa", "0xt1", 1, "200"),
                sample("0xbbb", "0xt2", 0, "300"),
            ])
            .await
            .unwrap();

        assert_eq!(store.transfer_count().await.unwrap(), 3);

        let rows = store.transfers_by_block_hash("0xaaa").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, "100");
        assert_eq!(rows[0].base.tx_index, 3);
        assert_eq!(rows[1].amount, "200");
    }

    #[tokio::test]
    async fn redelivery_upserts_instead_of_duplicating() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.persist(&[sample("0xaaa", "0xt1", 0, "100")]).await.unwrap();
        // Same log identity delivered again
        store.persist(&[sample("0xaaa", "0xt1", 0, "100")]).await.unwrap();

        assert_eq!(store.transfer_count().await.unwrap(), 1);
        let rows = store.transfers_by_block_hash("0xaaa").await.unwrap();
        assert_eq!(rows[0].amount, "100");
    }

    #[tokio::test]
    async fn amounts_survive_beyond_float_precision() {
        let store = SqliteStore::in_memory().await.unwrap();
        // 2^160-ish — far beyond f64/u64 range
        let big = "1461501637330902918203684832716283019655932542975";
        store.persist(&[sample("0xaaa", "0xt1", 0, big)]).await.unwrap();

        let rows = store.transfers_by_block_hash("0xaaa").await.unwrap();
        assert_eq!(rows[0].amount, big);
    }

    #[tokio::test]
    async fn empty_batch_is_noop() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.persist(&[]).await.unwrap();
        assert_eq!(store.transfer_count().await.unwrap(), 0);
    }

    // ── Reorg retraction ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn remove_by_block_hash_is_scoped() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .persist(&[
                sample("0xaaa", "0xt1", 0, "1"),
                sample("0xaaa", "0xt1", 1, "2"),
                sample("0xbbb", "0xt2", 0, "3"),
            ])
            .await
            .unwrap();

        let removed = store.remove_by_block_hash("0xaaa").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.transfers_by_block_hash("0xaaa").await.unwrap().is_empty());
        assert_eq!(store.transfers_by_block_hash("0xbbb").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_hash_is_idempotent_noop() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.remove_by_block_hash("0xghost").await.unwrap(), 0);
        assert_eq!(store.remove_by_block_hash("0xghost").await.unwrap(), 0);
    }

    // ── Checkpoints ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();

        let cp = SyncCheckpoint {
            chain: "ethereum".into(),
            registry_id: "marketplace".into(),
            block_number: 1_000,
            block_hash: "0xabcdef".into(),
            updated_at: 1_700_000_000,
        };
        store.save(cp).await.unwrap();

        let loaded = store.load("ethereum", "marketplace").await.unwrap().unwrap();
        assert_eq!(loaded.block_number, 1_000);
        assert_eq!(loaded.block_hash, "0xabcdef");
    }

    #[tokio::test]
    async fn checkpoint_upsert_keeps_single_row() {
        let store = SqliteStore::in_memory().await.unwrap();

        for (n, h) in [(100u64, "0xold"), (200, "0xnew")] {
            store
                .save(SyncCheckpoint {
                    chain: "ethereum".into(),
                    registry_id: "marketplace".into(),
                    block_number: n,
                    block_hash: h.into(),
                    updated_at: 0,
                })
                .await
                .unwrap();
        }

        let loaded = store.load("ethereum", "marketplace").await.unwrap().unwrap();
        assert_eq!(loaded.block_number, 200);
        assert_eq!(loaded.block_hash, "0xnew");
    }

    #[tokio::test]
    async fn checkpoint_missing_returns_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.load("unknown", "unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checkpoint_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .save(SyncCheckpoint {
                chain: "ethereum".into(),
                registry_id: "del-test".into(),
                block_number: 500,
                block_hash: "0xdef".into(),
                updated_at: 0,
            })
            .await
            .unwrap();

        store.delete("ethereum", "del-test").await.unwrap();
        assert!(store.load("ethereum", "del-test").await.unwrap().is_none());
    }
}
