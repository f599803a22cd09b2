use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::core::{extract_seen_pairs, render, InvalidInputError, Matcher};
use crate::models::{Assignment, MentionStyle};
use crate::services::slack::{SlackClient, SlackError};

/// Errors that can end a pairing run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

/// Per-run overrides supplied by the trigger
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub channel: Option<String>,
    pub lookback_days: Option<i64>,
    pub seed: Option<u64>,
    /// Post to the test channel (or nowhere) instead of the pairing channel
    pub dry_run: bool,
}

/// What a pairing run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub channel: String,
    pub assignment: Assignment,
    pub seen_pairs: usize,
    pub announcement: Option<String>,
    /// Channel the announcement went to, if it was posted
    pub posted_to: Option<String>,
}

/// Runs one pairing round against Slack
///
/// Fetches the channel members and recent history, matches members while
/// avoiding recent pairs, and posts the announcement.
pub struct PairingService {
    slack: Arc<SlackClient>,
    matcher: Matcher,
    channel: String,
    test_channel: Option<String>,
    lookback_days: i64,
    mention_style: MentionStyle,
}

impl PairingService {
    pub fn new(
        slack: Arc<SlackClient>,
        matcher: Matcher,
        channel: String,
        test_channel: Option<String>,
        lookback_days: i64,
        mention_style: MentionStyle,
    ) -> Self {
        Self {
            slack,
            matcher,
            channel,
            test_channel,
            lookback_days,
            mention_style,
        }
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunOutcome, RunError> {
        self.run_at(options, Utc::now()).await
    }

    /// Run a round as if the current time were `as_of`
    pub async fn run_at(&self, options: RunOptions, as_of: DateTime<Utc>) -> Result<RunOutcome, RunError> {
        let run_id = Uuid::new_v4();
        let lookback = lookback_window(options.lookback_days.unwrap_or(self.lookback_days))?;
        let oldest = as_of
            .checked_sub_signed(lookback)
            .ok_or(InvalidInputError::LookbackOutOfRange(lookback.num_days()))?;
        let channel = options.channel.unwrap_or_else(|| self.channel.clone());

        tracing::info!(
            "Starting pairing run {} for {} (lookback {} days, dry run: {})",
            run_id,
            channel,
            lookback.num_days(),
            options.dry_run
        );

        let channel_id = self.slack.resolve_channel_id(&channel).await?;
        let members = self.slack.get_members(&channel_id, self.mention_style).await?;
        let records = self.slack.get_history(&channel_id, oldest).await?;

        let seen = extract_seen_pairs(&records, lookback, as_of)?;
        let assignment = self
            .matcher
            .compute_assignment_seeded(&members, &seen, options.seed)?;

        let repeats = assignment.pairs.iter().filter(|p| seen.contains(p)).count();
        tracing::info!(
            "Run {}: {} members, {} pairs, {} repeats of recent pairs, odd one out: {}",
            run_id,
            members.len(),
            assignment.pairs.len(),
            repeats,
            assignment.odd_one_out.is_some()
        );

        let announcement = render(&assignment, self.matcher.odd_policy());

        let target = if options.dry_run {
            match &self.test_channel {
                Some(test_channel) => Some(self.slack.resolve_channel_id(test_channel).await?),
                None => None,
            }
        } else {
            Some(channel_id)
        };

        let posted_to = match (&announcement, target) {
            (Some(text), Some(target)) => {
                self.slack.post_message(&target, text).await?;
                Some(target)
            }
            (None, _) => {
                tracing::info!("Run {}: nothing to announce", run_id);
                None
            }
            (Some(_), None) => None,
        };

        Ok(RunOutcome {
            run_id,
            channel,
            assignment,
            seen_pairs: seen.len(),
            announcement,
            posted_to,
        })
    }
}

fn lookback_window(days: i64) -> Result<Duration, InvalidInputError> {
    let window = Duration::try_days(days).ok_or(InvalidInputError::LookbackOutOfRange(days))?;
    if window < Duration::zero() {
        return Err(InvalidInputError::NegativeLookback(window.num_seconds()));
    }
    Ok(window)
}
