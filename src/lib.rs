//! Random Coffee - repeat-avoiding random pairings for Slack channels
//!
//! The core pairs channel members at random while avoiding pairs announced
//! within a lookback window. History is read back from the channel's own
//! announcements, so no storage is needed between rounds.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{extract_seen_pairs, parse_pairs, render, InvalidInputError, Matcher};
pub use crate::models::{Assignment, HistoryRecord, OddPolicy, Pair, Participant, SeenSet};
