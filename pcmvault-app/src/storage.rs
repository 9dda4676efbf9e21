//! SQLite persistence for assets and features.
//!
//! Each call opens its own connection, so an `AssetStore` can be cloned into
//! blocking tasks without sharing a handle. WAL mode plus a busy timeout lets
//! concurrent batch workers write without tripping over each other.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pcmvault_core::{Asset, ContentHash, Feature, FeatureData};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("feature document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset id {0} is already taken by different content")]
    IdConflict(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct AssetStore {
    db_path: PathBuf,
}

impl AssetStore {
    pub fn new(db_path: PathBuf) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn open(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS assets (
              id TEXT PRIMARY KEY,
              workflow_id TEXT NOT NULL,
              workflow_run_id TEXT NOT NULL,
              parent_asset_id TEXT REFERENCES assets(id),
              file_path TEXT NOT NULL,
              content_hash TEXT NOT NULL,
              created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS features (
              id TEXT PRIMARY KEY,
              asset_id TEXT NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
              feature_type TEXT NOT NULL,
              schema_version INTEGER NOT NULL DEFAULT 1,
              feature_data TEXT NOT NULL,
              computation_params TEXT,
              computed_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assets_workflow_run ON assets(workflow_run_id);
            CREATE INDEX IF NOT EXISTS idx_assets_workflow_id ON assets(workflow_id);
            CREATE INDEX IF NOT EXISTS idx_assets_parent ON assets(parent_asset_id);
            CREATE INDEX IF NOT EXISTS idx_assets_content_hash ON assets(content_hash);
            CREATE UNIQUE INDEX IF NOT EXISTS uq_assets_root_content
              ON assets(content_hash) WHERE parent_asset_id IS NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS uq_assets_child_content
              ON assets(parent_asset_id, content_hash) WHERE parent_asset_id IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_features_asset ON features(asset_id);
            CREATE INDEX IF NOT EXISTS idx_features_type ON features(feature_type);
            CREATE INDEX IF NOT EXISTS idx_features_computed_at ON features(computed_at DESC);
            "#,
        )?;
        Ok(())
    }

    /// Store `asset`, or return the record that already holds its identity.
    ///
    /// Identity is the content hash among roots, and `(parent, content hash)`
    /// among derived assets. The insert and the lookup share one immediate
    /// transaction, so concurrent writers of the same content all get the
    /// winner's record back.
    pub fn insert_or_get_asset(&self, asset: &Asset) -> StoreResult<Asset> {
        let mut conn = self.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            r#"
            INSERT INTO assets
            (id, workflow_id, workflow_run_id, parent_asset_id, file_path, content_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT DO NOTHING
            "#,
            params![
                asset.id,
                asset.workflow_id,
                asset.workflow_run_id,
                asset.parent_asset_id,
                asset.file_path.to_string_lossy().into_owned(),
                asset.content_hash.as_str(),
                asset.created_at.timestamp_micros(),
            ],
        )?;
        let stored = tx
            .query_row(
                &format!("{ASSET_COLUMNS} WHERE parent_asset_id IS ?1 AND content_hash = ?2"),
                params![asset.parent_asset_id, asset.content_hash.as_str()],
                asset_from_row,
            )
            .optional()?;
        tx.commit()?;

        match stored {
            Some(stored) => {
                if inserted == 0 {
                    debug!(asset_id = %stored.id, hash = %stored.content_hash, "asset already stored");
                }
                Ok(stored)
            }
            None => Err(StoreError::IdConflict(asset.id.clone())),
        }
    }

    pub fn get_asset(&self, id: &str) -> StoreResult<Option<Asset>> {
        let conn = self.open()?;
        let asset = conn
            .query_row(
                &format!("{ASSET_COLUMNS} WHERE id = ?1"),
                params![id],
                asset_from_row,
            )
            .optional()?;
        Ok(asset)
    }

    /// Oldest asset with this content, if any.
    pub fn find_by_content_hash(&self, hash: &ContentHash) -> StoreResult<Option<Asset>> {
        let conn = self.open()?;
        let asset = conn
            .query_row(
                &format!("{ASSET_COLUMNS} WHERE content_hash = ?1 ORDER BY created_at ASC LIMIT 1"),
                params![hash.as_str()],
                asset_from_row,
            )
            .optional()?;
        Ok(asset)
    }

    /// Assets derived from `parent_id`, oldest first.
    pub fn children_of(&self, parent_id: &str) -> StoreResult<Vec<Asset>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(
            "{ASSET_COLUMNS} WHERE parent_asset_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![parent_id], asset_from_row)?;
        let assets = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    pub fn insert_feature(&self, feature: &Feature) -> StoreResult<()> {
        let (data, computation_params) = feature.data.to_documents()?;
        let computation_params = computation_params
            .map(|p| serde_json::to_string(&p))
            .transpose()?;
        let conn = self.open()?;
        conn.execute(
            r#"
            INSERT INTO features
            (id, asset_id, feature_type, schema_version, feature_data, computation_params, computed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                feature.id,
                feature.asset_id,
                feature.feature_type(),
                FeatureData::SCHEMA_VERSION,
                serde_json::to_string(&data)?,
                computation_params,
                feature.computed_at.timestamp_micros(),
            ],
        )?;
        Ok(())
    }

    /// Features of `asset_id`, newest first.
    pub fn list_features(&self, asset_id: &str) -> StoreResult<Vec<Feature>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, asset_id, feature_type, feature_data, computation_params, computed_at
            FROM features
            WHERE asset_id = ?1
            ORDER BY computed_at DESC
            "#,
        )?;
        let rows = stmt.query_map(params![asset_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, asset_id, feature_type, data, params, computed_at) = row?;
            let params = params
                .map(|p| serde_json::from_str::<serde_json::Value>(&p))
                .transpose()?;
            let data = FeatureData::from_documents(&feature_type, serde_json::from_str(&data)?, params)?;
            out.push(Feature {
                id,
                asset_id,
                data,
                computed_at: micros_to_datetime(computed_at),
            });
        }
        Ok(out)
    }
}

const ASSET_COLUMNS: &str = "SELECT id, workflow_id, workflow_run_id, parent_asset_id, file_path, content_hash, created_at FROM assets";

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        workflow_run_id: row.get(2)?,
        parent_asset_id: row.get(3)?,
        file_path: PathBuf::from(row.get::<_, String>(4)?),
        content_hash: ContentHash::from_hex(row.get::<_, String>(5)?),
        created_at: micros_to_datetime(row.get(6)?),
    })
}

fn micros_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts).unwrap_or_else(Utc::now)
}
