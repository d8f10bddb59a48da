//! Seams between the dispatch engine and the messaging backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RecipientId, RosterEntry};

/// Request/response transport to the messaging backend.
///
/// Implementations perform exactly one request per call; retries are the
/// caller's business (and the dispatch loop never retries).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Full group roster (`get_group_list`).
    async fn group_roster(&self) -> Result<Vec<RosterEntry>>;

    /// Full friend roster (`get_friend_list`).
    async fn friend_roster(&self) -> Result<Vec<RosterEntry>>;

    /// Send `text` to a group. Returns the raw response body on success.
    async fn send_group_message(&self, group_id: RecipientId, text: &str) -> Result<String>;

    /// Send `text` to a single user. Returns the raw response body on success.
    async fn send_private_message(&self, user_id: RecipientId, text: &str) -> Result<String>;
}
