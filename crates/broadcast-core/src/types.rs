//! Core domain types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque group or user identifier on the messaging backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecipientId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RecipientId)
    }
}

/// One row of the backend roster. Only lives until recipients are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: RecipientId,
    pub name: String,
}

impl RosterEntry {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: RecipientId(id),
            name: name.into(),
        }
    }
}

/// Which roster a campaign targets, and which send endpoint it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Group chats (`send_group_msg`).
    #[default]
    Group,
    /// Individual users (`send_private_msg`).
    Direct,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Group => write!(f, "group"),
            TargetKind::Direct => write!(f, "direct"),
        }
    }
}

/// Result of one send attempt, as written into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Backend accepted the message; holds the raw response body.
    Delivered(String),
    /// Transport or backend failure; holds the error text.
    Failed(String),
}

impl SendOutcome {
    /// Prefix the ledger uses for failed attempts.
    pub const FAILURE_PREFIX: &'static str = "失败: ";

    pub fn is_failure(&self) -> bool {
        matches!(self, SendOutcome::Failed(_))
    }

    /// Text recorded in the ledger line for this attempt.
    pub fn ledger_text(&self) -> String {
        match self {
            SendOutcome::Delivered(body) => body.clone(),
            SendOutcome::Failed(reason) => format!("{}{reason}", Self::FAILURE_PREFIX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_parse_trims() {
        let id: RecipientId = " 123456 ".parse().unwrap();
        assert_eq!(id, RecipientId(123456));
        assert!("abc".parse::<RecipientId>().is_err());
    }

    #[test]
    fn test_failure_ledger_text() {
        let outcome = SendOutcome::Failed("connection refused".into());
        assert!(outcome.is_failure());
        assert_eq!(outcome.ledger_text(), "失败: connection refused");

        let ok = SendOutcome::Delivered("{\"status\":\"ok\"}".into());
        assert_eq!(ok.ledger_text(), "{\"status\":\"ok\"}");
    }
}
