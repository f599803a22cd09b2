// Core algorithm exports
pub mod announcement;
pub mod error;
pub mod history;
pub mod matcher;

pub use announcement::{parse_pairs, render, ANNOUNCEMENT_HEADER};
pub use error::InvalidInputError;
pub use history::{extract_seen_pairs, DEFAULT_LOOKBACK_DAYS};
pub use matcher::{parse_seed, Matcher, DEFAULT_SEARCH_BUDGET};
