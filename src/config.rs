use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the case core. Defaults carry the production literals;
/// a YAML file can override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    /// Owner views closer together than this do not rewrite the review
    /// timestamp.
    pub review_debounce_seconds: i64,
    /// Cases unreviewed for longer than this many whole days are sweep
    /// candidates. Note: the practice talks about 15 days but the system
    /// has always compared against 10; see DESIGN.md before changing.
    pub dormancy_days: i64,
    /// Local hour (0-23) the daily sweep fires at.
    pub sweep_hour: u32,
    /// Per-file upload ceiling, bytes.
    pub max_file_bytes: u64,
    /// Total request body ceiling, bytes. Enforced by the transport
    /// layer; kept here so both layers read one number.
    pub max_request_bytes: u64,
    /// Object-store folder uploads land in.
    pub storage_folder: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            review_debounce_seconds: 60 * 60,
            dormancy_days: 10,
            sweep_hour: 9,
            max_file_bytes: 10 * 1024 * 1024,
            max_request_bytes: 50 * 1024 * 1024,
            storage_folder: "expedientes".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        Ok(config)
    }
}
