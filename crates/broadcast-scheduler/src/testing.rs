//! In-memory transport used by the scheduler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use broadcast_core::error::{BroadcastError, Result};
use broadcast_core::traits::Transport;
use broadcast_core::types::{RecipientId, RosterEntry, TargetKind};

/// Records every send; fails sends to `fail_sends_to` with a 500.
#[derive(Default)]
pub struct FakeTransport {
    pub groups: Vec<RosterEntry>,
    pub friends: Vec<RosterEntry>,
    pub roster_fails: bool,
    pub fail_sends_to: Vec<RecipientId>,
    pub sent: Mutex<Vec<(TargetKind, RecipientId, String)>>,
}

impl FakeTransport {
    pub fn with_groups(groups: Vec<RosterEntry>) -> Self {
        Self {
            groups,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(TargetKind, RecipientId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self) -> Vec<RecipientId> {
        self.sent().into_iter().map(|(_, id, _)| id).collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn deliver(&self, kind: TargetKind, id: RecipientId, text: &str) -> Result<String> {
        self.sent.lock().unwrap().push((kind, id, text.to_string()));
        if self.fail_sends_to.contains(&id) {
            return Err(BroadcastError::Api {
                status: 500,
                body: "{\"status\":\"failed\"}".into(),
            });
        }
        Ok("{\"status\":\"ok\",\"retcode\":0}".into())
    }

    fn roster(&self, entries: &[RosterEntry]) -> Result<Vec<RosterEntry>> {
        if self.roster_fails {
            return Err(BroadcastError::Http("connection refused".into()));
        }
        Ok(entries.to_vec())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }

    async fn group_roster(&self) -> Result<Vec<RosterEntry>> {
        self.roster(&self.groups)
    }

    async fn friend_roster(&self) -> Result<Vec<RosterEntry>> {
        self.roster(&self.friends)
    }

    async fn send_group_message(&self, group_id: RecipientId, text: &str) -> Result<String> {
        self.deliver(TargetKind::Group, group_id, text)
    }

    async fn send_private_message(&self, user_id: RecipientId, text: &str) -> Result<String> {
        self.deliver(TargetKind::Direct, user_id, text)
    }
}
