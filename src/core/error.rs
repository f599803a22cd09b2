use thiserror::Error;

/// Inputs the pairing core refuses to work with
///
/// Each variant names the invariant that was violated so the message can be
/// shown to whoever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
    #[error("duplicate participant {0}")]
    DuplicateParticipant(String),

    #[error("invalid participant {0:?}: identifiers must be non-empty and contain no whitespace")]
    InvalidParticipant(String),

    #[error("lookback window must not be negative (got {0}s)")]
    NegativeLookback(i64),

    #[error("lookback window of {0} days is out of range")]
    LookbackOutOfRange(i64),

    #[error("malformed seed {0:?}: expected a decimal or 0x-prefixed hex u64")]
    MalformedSeed(String),

    #[error("participant {0} cannot be paired with themselves")]
    SelfPair(String),
}
