//! # Broadcast Channels
//! Messaging backend transports.

pub mod onebot;

pub use onebot::{OneBotChannel, OneBotConfig};
