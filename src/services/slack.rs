use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::models::{HistoryRecord, MentionStyle, Participant};

/// Page size requested from paginated Slack methods
const PAGE_LIMIT: usize = 200;

/// Errors that can occur when interacting with Slack
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Slack API returned error: {0}")]
    ApiError(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Slack Web API client
///
/// Covers everything a pairing round needs from Slack:
/// - Resolving a channel name to its id
/// - Listing the human members of a channel
/// - Reading recent channel history
/// - Posting the announcement
pub struct SlackClient {
    base_url: String,
    token: String,
    client: Client,
}

impl SlackClient {
    /// Create a new Slack client authenticated with a bot token
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self, SlackError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    /// Resolve `#name`, `name`, or a raw channel id to a channel id
    pub async fn resolve_channel_id(&self, channel: &str) -> Result<String, SlackError> {
        if looks_like_channel_id(channel) {
            return Ok(channel.to_string());
        }

        let name = channel.trim_start_matches('#');
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("types", "public_channel,private_channel".to_string()),
                ("exclude_archived", "true".to_string()),
                ("limit", "1000".to_string()),
            ];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }

            let json = self.get("conversations.list", &params).await?;
            let channels = array_field(&json, "channels")?;

            if let Some(found) = channels
                .iter()
                .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
            {
                return found
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| SlackError::InvalidResponse("Channel without id".into()));
            }

            cursor = next_cursor(&json);
            if cursor.is_none() {
                return Err(SlackError::ChannelNotFound(channel.to_string()));
            }
        }
    }

    /// List the human members of a channel
    ///
    /// Bots, deleted accounts and Slackbot are left out. Members are returned
    /// sorted by their rendered identifier.
    pub async fn get_members(
        &self,
        channel_id: &str,
        style: MentionStyle,
    ) -> Result<Vec<Participant>, SlackError> {
        let mut member_ids: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("channel", channel_id.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }

            let json = self.get("conversations.members", &params).await?;
            member_ids.extend(
                array_field(&json, "members")?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string),
            );

            cursor = next_cursor(&json);
            if cursor.is_none() {
                break;
            }
        }

        let mut members = Vec::with_capacity(member_ids.len());
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }

            let json = self.get("users.list", &params).await?;
            for user in array_field(&json, "members")? {
                let Some(id) = user.get("id").and_then(Value::as_str) else {
                    continue;
                };
                if !member_ids.contains(id) || is_bot_or_deleted(user) {
                    continue;
                }
                let participant = match style {
                    MentionStyle::Mention => format!("<@{}>", id),
                    MentionStyle::Handle => {
                        let name = user.get("name").and_then(Value::as_str).unwrap_or(id);
                        format!("@{}", name)
                    }
                };
                members.push(Participant::new(participant));
            }

            cursor = next_cursor(&json);
            if cursor.is_none() {
                break;
            }
        }

        members.sort();
        tracing::debug!("Channel {} has {} human members", channel_id, members.len());

        Ok(members)
    }

    /// Fetch channel messages posted at or after `oldest`
    pub async fn get_history(
        &self,
        channel_id: &str,
        oldest: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>, SlackError> {
        let oldest_ts = format_slack_ts(oldest);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = vec![
                ("channel", channel_id.to_string()),
                ("oldest", oldest_ts.clone()),
                ("inclusive", "true".to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(c) = &cursor {
                params.push(("cursor", c.clone()));
            }

            let json = self.get("conversations.history", &params).await?;
            for message in array_field(&json, "messages")? {
                let text = message.get("text").and_then(Value::as_str);
                let posted_at = message
                    .get("ts")
                    .and_then(Value::as_str)
                    .and_then(parse_slack_ts);

                match (text, posted_at) {
                    (Some(text), Some(posted_at)) => records.push(HistoryRecord::new(text, posted_at)),
                    _ => tracing::trace!("Skipping history message without text or timestamp"),
                }
            }

            cursor = next_cursor(&json);
            if cursor.is_none() {
                break;
            }
        }

        tracing::debug!("Fetched {} history messages from {}", records.len(), channel_id);

        Ok(records)
    }

    /// Post a plain text message to a channel
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let url = format!("{}/chat.postMessage", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel, "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SlackError::ApiError(format!(
                "chat.postMessage failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        check_ok(&json)?;

        tracing::info!("Posted announcement to {}", channel);
        Ok(())
    }

    async fn get(&self, method: &str, params: &[(&str, String)]) -> Result<Value, SlackError> {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!("{}/{}?{}", self.base_url.trim_end_matches('/'), method, query);

        tracing::debug!("Calling Slack method {}", method);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SlackError::ApiError(format!(
                "{} failed: {}",
                method,
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        check_ok(&json)?;
        Ok(json)
    }
}

fn check_ok(json: &Value) -> Result<(), SlackError> {
    if json.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let error = json
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(SlackError::ApiError(error.to_string()))
}

fn array_field<'a>(json: &'a Value, field: &str) -> Result<&'a Vec<Value>, SlackError> {
    json.get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| SlackError::InvalidResponse(format!("Missing {} array", field)))
}

fn next_cursor(json: &Value) -> Option<String> {
    json.get("response_metadata")
        .and_then(|m| m.get("next_cursor"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn is_bot_or_deleted(user: &Value) -> bool {
    let flag = |name: &str| user.get(name).and_then(Value::as_bool).unwrap_or(false);
    flag("is_bot") || flag("deleted") || user.get("id").and_then(Value::as_str) == Some("USLACKBOT")
}

fn looks_like_channel_id(channel: &str) -> bool {
    channel.len() >= 9
        && (channel.starts_with('C') || channel.starts_with('G'))
        && channel.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Parse a Slack message timestamp such as `1709283600.000200`
pub fn parse_slack_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    if frac.is_empty() || frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let nanos: u32 = format!("{:0<9}", frac).parse().ok()?;
    DateTime::from_timestamp(secs, nanos)
}

fn format_slack_ts(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}
