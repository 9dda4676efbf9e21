//! Command handlers.
//!
//! Each handler runs one engine operation and records its outcome in the
//! asset store. Handlers are synchronous; the batch runner calls them from
//! blocking tasks.

use std::path::Path;

use anyhow::{anyhow, ensure, Context};
use pcmvault_core::hashing::hash_file;
use pcmvault_core::{
    Asset, AssetInfo, Feature, SilenceParams, SnrMeasurement, SnrParams, TrimResult,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub asset: AssetInfo,
    /// True when an asset with identical content was already stored.
    pub existing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrimReport {
    pub source_asset_id: String,
    #[serde(flatten)]
    pub result: TrimResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnrReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(flatten)]
    pub measurement: SnrMeasurement,
}

/// Ingest `path` and store it, reusing an existing asset with the same content.
pub fn ingest(state: &AppState, path: &Path) -> anyhow::Result<IngestReport> {
    let mut info = state
        .engine
        .ingest(path)
        .with_context(|| format!("ingesting {}", path.display()))?;

    let stored = match state.store.find_by_content_hash(&info.content_hash)? {
        Some(existing) => existing,
        None => state.store.insert_or_get_asset(&info.to_asset(&state.run))?,
    };
    let existing = stored.id != info.asset_id;
    if existing {
        info!(asset_id = %stored.id, hash = %info.content_hash, "content already stored");
        info.asset_id = stored.id;
    }
    Ok(IngestReport {
        asset: info,
        existing,
    })
}

/// Resolve the stored asset for `path`: the given id (which must match the
/// file's content) or the asset found/created by [`ingest`].
pub fn source_asset(state: &AppState, path: &Path, asset_id: Option<&str>) -> anyhow::Result<Asset> {
    let Some(id) = asset_id else {
        let report = ingest(state, path)?;
        return state
            .store
            .get_asset(&report.asset.asset_id)?
            .ok_or_else(|| anyhow!("asset {} vanished after ingest", report.asset.asset_id));
    };

    let asset = state
        .store
        .get_asset(id)?
        .ok_or_else(|| anyhow!("unknown asset id: {id}"))?;
    let hash = hash_file(path).with_context(|| format!("hashing {}", path.display()))?;
    ensure!(
        hash == asset.content_hash,
        "{} does not match asset {id} (content hash {hash} vs {})",
        path.display(),
        asset.content_hash
    );
    Ok(asset)
}

/// Trim silence from `path`; a new trimmed asset is stored as a child of the source.
///
/// Trimming the same source to the same content again reports the child
/// stored the first time instead of adding another.
pub fn trim(
    state: &AppState,
    path: &Path,
    asset_id: Option<&str>,
    params: &SilenceParams,
) -> anyhow::Result<TrimReport> {
    let source = source_asset(state, path, asset_id)?;
    let mut result = state
        .engine
        .trim_silence_with(path, params)
        .with_context(|| format!("trimming {}", path.display()))?;

    if let (Some(new_id), Some(output)) = (result.new_asset_id.clone(), result.output_path.clone()) {
        let child = Asset::derived(
            new_id.clone(),
            &state.run,
            source.id.clone(),
            output.clone(),
            result.content_hash.clone(),
        );
        let stored = state.store.insert_or_get_asset(&child)?;
        if stored.id == new_id {
            info!(
                source_asset_id = %source.id,
                new_asset_id = %new_id,
                output = %output.display(),
                "trimmed asset stored"
            );
        } else {
            info!(
                source_asset_id = %source.id,
                asset_id = %stored.id,
                "trimmed content already stored for this source"
            );
            result.new_asset_id = Some(stored.id);
        }
    }

    Ok(TrimReport {
        source_asset_id: source.id,
        result,
    })
}

/// Compute SNR for `path`; with an asset id, also store it as a feature.
///
/// The asset must exist and match the file's content. Storing is
/// best-effort: a failed insert is logged and the measurement is still
/// returned.
pub fn snr(
    state: &AppState,
    path: &Path,
    asset_id: Option<&str>,
    params: &SnrParams,
) -> anyhow::Result<SnrReport> {
    if asset_id.is_some() {
        source_asset(state, path, asset_id)?;
    }
    let measurement = state
        .engine
        .compute_snr_with(path, params)
        .with_context(|| format!("computing SNR for {}", path.display()))?;

    let feature_id = asset_id.and_then(|id| {
        let feature = Feature::snr(id, measurement, params);
        match state.store.insert_feature(&feature) {
            Ok(()) => Some(feature.id),
            Err(e) => {
                warn!(asset_id = id, "failed to store snr feature: {e}");
                None
            }
        }
    });

    Ok(SnrReport {
        asset_id: asset_id.map(str::to_owned),
        feature_id,
        measurement,
    })
}

/// Stored features of an asset, newest first.
pub fn features(state: &AppState, asset_id: &str) -> anyhow::Result<Vec<Feature>> {
    ensure!(
        state.store.get_asset(asset_id)?.is_some(),
        "unknown asset id: {asset_id}"
    );
    Ok(state.store.list_features(asset_id)?)
}
