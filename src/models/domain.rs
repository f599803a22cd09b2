use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::error::InvalidInputError;

/// Opaque identifier of a channel member, e.g. `<@U0123ABC>` or `@alice`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifiers must survive a trip through the announcement text
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Participant {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Participant {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Unordered pair of two distinct participants
///
/// Stored canonically with the lexicographically smaller identifier first, so
/// `Pair::new(a, b) == Pair::new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PairFields")]
pub struct Pair {
    first: Participant,
    second: Participant,
}

impl Pair {
    pub fn new(a: Participant, b: Participant) -> Result<Self, InvalidInputError> {
        if a == b {
            return Err(InvalidInputError::SelfPair(a.to_string()));
        }
        if a < b {
            Ok(Self { first: a, second: b })
        } else {
            Ok(Self { first: b, second: a })
        }
    }

    /// Build a pair from identifiers already known to be distinct
    pub(crate) fn ordered(a: &Participant, b: &Participant) -> Self {
        debug_assert_ne!(a, b);
        if a < b {
            Self { first: a.clone(), second: b.clone() }
        } else {
            Self { first: b.clone(), second: a.clone() }
        }
    }

    pub fn first(&self) -> &Participant {
        &self.first
    }

    pub fn second(&self) -> &Participant {
        &self.second
    }

    pub fn contains(&self, participant: &Participant) -> bool {
        &self.first == participant || &self.second == participant
    }
}

#[derive(Deserialize)]
struct PairFields {
    first: Participant,
    second: Participant,
}

impl TryFrom<PairFields> for Pair {
    type Error = InvalidInputError;

    fn try_from(fields: PairFields) -> Result<Self, Self::Error> {
        Pair::new(fields.first, fields.second)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} and {}", self.first, self.second)
    }
}

/// How often and how recently a pair was announced within the lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairHistory {
    pub count: u32,
    /// `None` when the pair came from a source without timestamps
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,
}

/// Pairs seen in recent history, weighted by recency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenSet {
    pairs: HashMap<Pair, PairHistory>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `pair` announced at `seen_at`
    pub fn record(&mut self, pair: Pair, seen_at: Option<chrono::DateTime<chrono::Utc>>) {
        let entry = self.pairs.entry(pair).or_insert(PairHistory {
            count: 0,
            last_seen: None,
        });
        entry.count += 1;
        entry.last_seen = entry.last_seen.max(seen_at);
    }

    pub fn contains(&self, pair: &Pair) -> bool {
        self.pairs.contains_key(pair)
    }

    pub fn history(&self, pair: &Pair) -> Option<&PairHistory> {
        self.pairs.get(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.keys()
    }
}

impl FromIterator<Pair> for SeenSet {
    fn from_iter<I: IntoIterator<Item = Pair>>(iter: I) -> Self {
        let mut seen = SeenSet::new();
        for pair in iter {
            seen.record(pair, None);
        }
        seen
    }
}

/// Result of one pairing round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub pairs: Vec<Pair>,
    #[serde(rename = "oddOneOut")]
    pub odd_one_out: Option<Participant>,
}

impl Assignment {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.odd_one_out.is_none()
    }

    /// Every participant named by the assignment, odd-one-out included
    pub fn participants(&self) -> Vec<&Participant> {
        let mut all: Vec<&Participant> = self
            .pairs
            .iter()
            .flat_map(|pair| [pair.first(), pair.second()])
            .chain(self.odd_one_out.iter())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

/// Raw message pulled from the channel history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub text: String,
    pub posted_at: chrono::DateTime<chrono::Utc>,
}

impl HistoryRecord {
    pub fn new(text: impl Into<String>, posted_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            text: text.into(),
            posted_at,
        }
    }
}

/// What happens to the odd-one-out in an odd-sized group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddPolicy {
    /// Leave the odd-one-out unpaired for this round
    #[default]
    SitOut,
    /// Add the odd-one-out to an existing pair as a second conversation
    JoinPair,
}

/// How members are written into the announcement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionStyle {
    /// `<@U0123ABC>`, which notifies the member
    #[default]
    Mention,
    /// `@alice`, plain text that pings nobody
    Handle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_pair_is_unordered() {
        let ab = Pair::new("a".into(), "b".into()).unwrap();
        let ba = Pair::new("b".into(), "a".into()).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.first().as_str(), "a");
        assert!(ab.contains(&"b".into()));
        assert!(!ab.contains(&"c".into()));
    }

    #[test]
    fn test_pair_rejects_self() {
        let err = Pair::new("a".into(), "a".into()).unwrap_err();
        assert_eq!(err, InvalidInputError::SelfPair("a".to_string()));
    }

    #[test]
    fn test_pair_deserializes_canonically() {
        let pair: Pair = serde_json::from_str(r#"{"first":"b","second":"a"}"#).unwrap();
        assert_eq!(pair.first().as_str(), "a");
        assert_eq!(pair.second().as_str(), "b");

        let err = serde_json::from_str::<Pair>(r#"{"first":"a","second":"a"}"#).unwrap_err();
        assert!(err.to_string().contains("cannot be paired with themselves"));
    }

    #[test]
    fn test_seen_set_collapses_duplicates() {
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
        let pair = Pair::new("a".into(), "b".into()).unwrap();

        let mut seen = SeenSet::new();
        seen.record(pair.clone(), Some(newer));
        seen.record(pair.clone(), Some(older));

        assert_eq!(seen.len(), 1);
        let history = seen.history(&pair).unwrap();
        assert_eq!(history.count, 2);
        assert_eq!(history.last_seen, Some(newer));
    }

    #[test]
    fn test_participant_well_formed() {
        assert!(Participant::from("<@U123>").is_well_formed());
        assert!(!Participant::from("").is_well_formed());
        assert!(!Participant::from("two words").is_well_formed());
    }
}
