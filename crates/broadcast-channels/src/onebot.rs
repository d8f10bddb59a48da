//! OneBot HTTP API transport — roster queries and message sending.
//!
//! Endpoints used: `get_group_list`, `get_friend_list`, `send_group_msg`,
//! `send_private_msg`. When an access token is configured it is sent as the
//! URL-encoded `access_token` query parameter on every request.

use async_trait::async_trait;
use broadcast_core::error::{BroadcastError, Result};
use broadcast_core::text::normalize_newlines;
use broadcast_core::traits::Transport;
use broadcast_core::types::{RecipientId, RosterEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OneBot transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneBotConfig {
    pub api_base: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl OneBotConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            access_token: String::new(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }
}

/// HTTP client for a OneBot-compatible backend.
pub struct OneBotChannel {
    config: OneBotConfig,
    client: reqwest::Client,
}

impl OneBotChannel {
    pub fn new(config: OneBotConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BroadcastError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, action: &str) -> String {
        format!("{}/{action}", self.config.api_base.trim_end_matches('/'))
    }

    fn request(&self, method: reqwest::Method, action: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.api_url(action));
        if self.config.access_token.is_empty() {
            builder
        } else {
            builder.query(&[("access_token", self.config.access_token.as_str())])
        }
    }

    /// GET a roster endpoint and return the raw body.
    async fn fetch(&self, action: &str) -> Result<String> {
        let response = self
            .request(reqwest::Method::GET, action)
            .send()
            .await
            .map_err(|e| BroadcastError::Http(format!("{action} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BroadcastError::Http(format!("failed to read {action} body: {e}")))?;

        if !status.is_success() {
            return Err(BroadcastError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// POST a send endpoint. The raw body is returned on 2xx and carried
    /// inside the error otherwise.
    async fn post(&self, action: &str, payload: &serde_json::Value) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, action)
            .json(payload)
            .send()
            .await
            .map_err(|e| BroadcastError::Http(format!("failed to send POST request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BroadcastError::Http(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            tracing::debug!(action, status = status.as_u16(), "OneBot send rejected");
            return Err(BroadcastError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for OneBotChannel {
    fn name(&self) -> &str {
        "onebot"
    }

    async fn group_roster(&self) -> Result<Vec<RosterEntry>> {
        let body = self.fetch("get_group_list").await?;
        let roster = parse_group_list(&body)?;
        tracing::info!(groups = roster.len(), "Fetched group roster");
        Ok(roster)
    }

    async fn friend_roster(&self) -> Result<Vec<RosterEntry>> {
        let body = self.fetch("get_friend_list").await?;
        let roster = parse_friend_list(&body)?;
        tracing::info!(friends = roster.len(), "Fetched friend roster");
        Ok(roster)
    }

    async fn send_group_message(&self, group_id: RecipientId, text: &str) -> Result<String> {
        self.post("send_group_msg", &group_payload(group_id, text)).await
    }

    async fn send_private_message(&self, user_id: RecipientId, text: &str) -> Result<String> {
        self.post("send_private_msg", &private_payload(user_id, text)).await
    }
}

/// `send_group_msg` body; `user_id` is always 0.
pub fn group_payload(group_id: RecipientId, text: &str) -> serde_json::Value {
    serde_json::json!({
        "group_id": group_id.0,
        "user_id": 0,
        "message": normalize_newlines(text),
    })
}

/// `send_private_msg` body.
pub fn private_payload(user_id: RecipientId, text: &str) -> serde_json::Value {
    serde_json::json!({
        "user_id": user_id.0,
        "message": normalize_newlines(text),
    })
}

// --- OneBot API Types ---

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct OneBotResponse<T> {
    /// Absent and `null` both mean an empty list.
    #[serde(default)]
    pub data: Option<Vec<T>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub member_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendInfo {
    /// Some implementations send a number, others a decimal string.
    pub user_id: serde_json::Value,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub remark: String,
}

impl FriendInfo {
    pub fn id(&self) -> Option<RecipientId> {
        match &self.user_id {
            serde_json::Value::Number(n) => n.as_i64().map(RecipientId),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Decode a `get_group_list` body into roster entries, preserving order.
pub fn parse_group_list(body: &str) -> Result<Vec<RosterEntry>> {
    let list: OneBotResponse<GroupInfo> = serde_json::from_str(body)
        .map_err(|e| BroadcastError::Decode(format!("get_group_list: {e}")))?;
    if list.retcode != 0 {
        tracing::warn!(retcode = list.retcode, status = %list.status, message = %list.message, "get_group_list returned non-zero retcode");
    }
    Ok(list
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|g| RosterEntry::new(g.group_id, g.group_name))
        .collect())
}

/// Decode a `get_friend_list` body. Friends whose id cannot be read are dropped.
pub fn parse_friend_list(body: &str) -> Result<Vec<RosterEntry>> {
    let list: OneBotResponse<FriendInfo> = serde_json::from_str(body)
        .map_err(|e| BroadcastError::Decode(format!("get_friend_list: {e}")))?;
    if list.retcode != 0 {
        tracing::warn!(retcode = list.retcode, status = %list.status, message = %list.message, "get_friend_list returned non-zero retcode");
    }
    let data = list.data.unwrap_or_default();
    let mut roster = Vec::with_capacity(data.len());
    for friend in data {
        match friend.id() {
            Some(id) => roster.push(RosterEntry::new(id.0, friend.nickname)),
            None => tracing::warn!(user_id = %friend.user_id, "Skipping friend with unreadable user_id"),
        }
    }
    Ok(roster)
}
