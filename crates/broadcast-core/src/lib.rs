//! # Broadcast Core
//! Shared error type, configuration, domain types and the transport trait.

pub mod config;
pub mod error;
pub mod text;
pub mod traits;
pub mod types;

pub use config::BroadcastConfig;
pub use error::{BroadcastError, Result};
pub use traits::Transport;
pub use types::{RecipientId, RosterEntry, SendOutcome, TargetKind};
