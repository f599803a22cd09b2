// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Assignment, HistoryRecord, MentionStyle, OddPolicy, Pair, PairHistory, Participant, SeenSet};
pub use requests::RunPairingRequest;
pub use responses::{ErrorResponse, HealthResponse, RunPairingResponse};
