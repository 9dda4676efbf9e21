use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::new_id;
use crate::snr::{SnrMeasurement, SnrParams};

/// Inputs recorded alongside an SNR feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnrComputationParams {
    pub noise_threshold: f64,
    pub use_silent_segments: bool,
}

impl From<&SnrParams> for SnrComputationParams {
    fn from(params: &SnrParams) -> Self {
        Self {
            noise_threshold: params.effective_noise_threshold(),
            use_silent_segments: params.strategy.uses_silent_segments(),
        }
    }
}

impl Default for SnrComputationParams {
    fn default() -> Self {
        Self::from(&SnrParams::default())
    }
}

/// Closed set of feature payloads, tagged by `feature_type`.
///
/// Serializes to `{"feature_type": ..., "feature_data": {...},
/// "computation_params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature_type", rename_all = "snake_case")]
pub enum FeatureData {
    Snr {
        feature_data: SnrMeasurement,
        #[serde(default)]
        computation_params: SnrComputationParams,
    },
}

impl FeatureData {
    /// Version of the payload layouts above; stored next to each feature.
    pub const SCHEMA_VERSION: u32 = 1;

    pub fn feature_type(&self) -> &'static str {
        match self {
            Self::Snr { .. } => "snr",
        }
    }

    /// Split into the `feature_data` and `computation_params` documents.
    pub fn to_documents(&self) -> serde_json::Result<(Value, Option<Value>)> {
        match self {
            Self::Snr {
                feature_data,
                computation_params,
            } => Ok((
                serde_json::to_value(feature_data)?,
                Some(serde_json::to_value(computation_params)?),
            )),
        }
    }

    /// Rebuild from stored documents.
    ///
    /// # Errors
    /// Fails on an unknown `feature_type` or a document that does not match it.
    pub fn from_documents(
        feature_type: &str,
        feature_data: Value,
        computation_params: Option<Value>,
    ) -> serde_json::Result<Self> {
        let mut doc = Map::new();
        doc.insert("feature_type".into(), Value::String(feature_type.into()));
        doc.insert("feature_data".into(), feature_data);
        if let Some(params) = computation_params {
            doc.insert("computation_params".into(), params);
        }
        serde_json::from_value(Value::Object(doc))
    }
}

/// An immutable computed feature attached to an asset.
///
/// Re-computing creates a new record; existing ones are never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub asset_id: String,
    #[serde(flatten)]
    pub data: FeatureData,
    pub computed_at: DateTime<Utc>,
}

impl Feature {
    pub fn new(asset_id: impl Into<String>, data: FeatureData) -> Self {
        Self {
            id: new_id("feat"),
            asset_id: asset_id.into(),
            data,
            computed_at: Utc::now(),
        }
    }

    /// An `"snr"` feature for `asset_id`.
    pub fn snr(asset_id: impl Into<String>, measurement: SnrMeasurement, params: &SnrParams) -> Self {
        Self::new(
            asset_id,
            FeatureData::Snr {
                feature_data: measurement,
                computation_params: SnrComputationParams::from(params),
            },
        )
    }

    pub fn feature_type(&self) -> &'static str {
        self.data.feature_type()
    }
}
