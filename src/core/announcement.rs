//! Announcement text posted to the channel after every round.
//!
//! The same text is read back by the history extractor on later rounds, so
//! whatever [`render`] writes, [`parse_pairs`] must understand:
//!
//! ```text
//! This week's random coffees are:
//!  1. <@U1> and <@U2>
//!  2. <@U3> and <@U4>
//! Odd one out this round: <@U5>
//! ```
//!
//! Older announcements spell the header `This weeks random coffees are:` and
//! end with a free-text note; both are accepted.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;

use crate::models::{Assignment, OddPolicy, Pair, Participant};

pub const ANNOUNCEMENT_HEADER: &str = "This week's random coffees are:";

lazy_static! {
    static ref HEADER_RE: Regex = Regex::new(r"(?i)^\s*this week['’]?s random coffees are:?\s*$").unwrap();
    static ref PAIR_LINE_RE: Regex = Regex::new(r"^\s*\d+\.\s+(\S+)\s+and\s+(\S+)\s*$").unwrap();
}

/// Format an assignment as announcement text
///
/// Returns `None` when there are no pairs, since there is nothing to announce.
pub fn render(assignment: &Assignment, policy: OddPolicy) -> Option<String> {
    if assignment.pairs.is_empty() {
        return None;
    }

    let mut message = String::from(ANNOUNCEMENT_HEADER);
    message.push('\n');
    for (i, pair) in assignment.pairs.iter().enumerate() {
        // Writing into a String cannot fail
        let _ = writeln!(message, " {}. {} and {}", i + 1, pair.first(), pair.second());
    }

    if let Some(odd) = &assignment.odd_one_out {
        let _ = match policy {
            OddPolicy::SitOut => writeln!(message, "Odd one out this round: {}", odd),
            OddPolicy::JoinPair => writeln!(message, "{} will have two conversations this round", odd),
        };
    }

    Some(message.trim_end().to_string())
}

/// Extract the pairs announced in `text`
///
/// Returns `None` for anything that is not an announcement: a missing header
/// or no parseable pair lines. Lines naming the same participant twice are
/// ignored.
pub fn parse_pairs(text: &str) -> Option<Vec<Pair>> {
    let mut lines = text.lines();
    lines.by_ref().find(|line| HEADER_RE.is_match(line))?;

    let pairs: Vec<Pair> = lines
        .filter_map(|line| PAIR_LINE_RE.captures(line))
        .filter_map(|caps| {
            Pair::new(Participant::from(&caps[1]), Participant::from(&caps[2])).ok()
        })
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs)
    }
}
