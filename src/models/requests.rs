use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to run one pairing round
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RunPairingRequest {
    /// Channel name (`#randomcoffees`) or id; falls back to the configured channel
    #[validate(length(min = 1))]
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    #[serde(alias = "lookback_days", rename = "lookbackDays")]
    pub lookback_days: Option<i64>,
    /// Decimal or `0x` hex u64, for reproducible rounds
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    #[serde(alias = "dry_run", rename = "dryRun")]
    pub dry_run: bool,
}
