// Service exports
pub mod pairing;
pub mod slack;

pub use pairing::{PairingService, RunError, RunOptions, RunOutcome};
pub use slack::{SlackClient, SlackError};
