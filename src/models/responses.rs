use serde::{Deserialize, Serialize};
use crate::models::domain::{Pair, Participant};

/// Response for the run pairing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPairingResponse {
    #[serde(rename = "runId")]
    pub run_id: String,
    pub channel: String,
    pub pairs: Vec<Pair>,
    #[serde(rename = "oddOneOut")]
    pub odd_one_out: Option<Participant>,
    #[serde(rename = "seenPairs")]
    pub seen_pairs: usize,
    pub posted: bool,
    pub announcement: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
