//! # Broadcast Scheduler
//!
//! The campaign dispatch engine.
//!
//! ```text
//! RecipientSource ─┐
//!                  ├─> DispatchLoop ──> Transport (send_group_msg / send_private_msg)
//! MessageSource  ──┘        │
//!                           └──> ProgressLedger (<campaign>-save.txt)
//! ```
//!
//! Everything runs on one task, one recipient at a time. The only background
//! work is the [`TextAssetStore`] refresh task.

pub mod assets;
pub mod dispatch;
pub mod ledger;
pub mod messages;
pub mod recipients;

#[cfg(test)]
mod testing;

pub use assets::TextAssetStore;
pub use dispatch::{DispatchLoop, DispatchReport, DispatchSettings};
pub use ledger::{LedgerSummary, ProgressLedger};
pub use messages::resolve_messages;
pub use recipients::{RecipientMode, ResolvedRecipients, resolve_recipients};
