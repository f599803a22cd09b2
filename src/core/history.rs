use chrono::{DateTime, Duration, Utc};

use crate::core::announcement::parse_pairs;
use crate::core::error::InvalidInputError;
use crate::models::{HistoryRecord, SeenSet};

/// Default span of history that counts as "recent"
pub const DEFAULT_LOOKBACK_DAYS: i64 = 28;

/// Build the set of recently announced pairs from raw channel history
///
/// A record is considered when `as_of - lookback_window <= posted_at <= as_of`.
/// Records that are not announcements are skipped. Record order does not
/// matter; repeated pairs are counted and keep their latest timestamp.
pub fn extract_seen_pairs(
    records: &[HistoryRecord],
    lookback_window: Duration,
    as_of: DateTime<Utc>,
) -> Result<SeenSet, InvalidInputError> {
    if lookback_window < Duration::zero() {
        return Err(InvalidInputError::NegativeLookback(lookback_window.num_seconds()));
    }

    // A window reaching past the representable range covers all history
    let cutoff = as_of
        .checked_sub_signed(lookback_window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut seen = SeenSet::new();
    let mut announcements = 0usize;
    let mut skipped = 0usize;

    for record in records {
        if record.posted_at < cutoff || record.posted_at > as_of {
            continue;
        }
        match parse_pairs(&record.text) {
            Some(pairs) => {
                announcements += 1;
                for pair in pairs {
                    seen.record(pair, Some(record.posted_at));
                }
            }
            None => skipped += 1,
        }
    }

    tracing::debug!(
        "Extracted {} seen pairs from {} announcements ({} records skipped, cutoff {})",
        seen.len(),
        announcements,
        skipped,
        cutoff
    );

    Ok(seen)
}
