//! Dispatch loop — the serial, resumable send loop of a campaign.
//!
//! For each recipient in order: skip if the ledger has it settled, pick a
//! variant, roll the chance gate, send, record the outcome, then wait.
//! Chance-gated skips are not recorded so a later run can roll again; every
//! attempted send is recorded, success or failure, and never retried.
//!
//! Cancellation is observed between recipients and during the delay, never
//! between a send and its ledger write.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use broadcast_core::error::{BroadcastError, Result};
use broadcast_core::traits::Transport;
use broadcast_core::types::{RecipientId, SendOutcome, TargetKind};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use crate::ledger::{ProgressLedger, timestamp_now};

/// Pacing and targeting knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Pause after every processed recipient (not after settled skips).
    pub delay: Duration,
    /// Percent chance (0..=100) that a pending recipient is messaged.
    pub chance_percent: u8,
    pub target: TargetKind,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            chance_percent: 100,
            target: TargetKind::Group,
        }
    }
}

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub considered: usize,
    pub already_settled: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped_by_chance: usize,
    pub cancelled: bool,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Serial campaign sender.
pub struct DispatchLoop {
    transport: Arc<dyn Transport>,
    ledger: ProgressLedger,
    settings: DispatchSettings,
    cancel: CancellationToken,
}

impl DispatchLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        ledger: ProgressLedger,
        settings: DispatchSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            ledger,
            settings,
            cancel,
        }
    }

    /// Run the campaign over `recipients`.
    ///
    /// Only an empty variant list is an error; per-recipient failures are
    /// recorded and the loop moves on.
    pub async fn run<R: Rng>(
        &self,
        original_list: &Path,
        recipients: &[RecipientId],
        variants: &[String],
        rng: &mut R,
    ) -> Result<DispatchReport> {
        if variants.is_empty() {
            return Err(BroadcastError::EmptyMessages(self.ledger.campaign().to_string()));
        }

        let mut report = DispatchReport::default();
        tracing::info!(
            campaign = self.ledger.campaign(),
            recipients = recipients.len(),
            variants = variants.len(),
            chance = self.settings.chance_percent,
            delay_secs = self.settings.delay.as_secs(),
            target = %self.settings.target,
            "Starting dispatch"
        );

        for &recipient in recipients {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.considered += 1;

            let settled = self.ledger.is_settled(recipient).unwrap_or_else(|e| {
                tracing::warn!(%recipient, "Ledger lookup failed, treating as pending: {e}");
                false
            });
            if settled {
                tracing::debug!(%recipient, "Already settled, skipping");
                report.already_settled += 1;
                continue;
            }

            let Some(message) = variants.choose(&mut *rng) else {
                break;
            };

            if rng.gen_range(0..100u8) < self.settings.chance_percent {
                let outcome = self.send(recipient, message).await;
                if outcome.is_failure() {
                    report.failed += 1;
                } else {
                    report.sent += 1;
                }
                self.record(original_list, recipient, &outcome);
            } else {
                tracing::info!(%recipient, "Skipped by chance setting");
                report.skipped_by_chance += 1;
            }

            if !self.pause().await {
                report.cancelled = true;
                break;
            }
        }

        tracing::info!(
            considered = report.considered,
            settled = report.already_settled,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped_by_chance,
            cancelled = report.cancelled,
            "Dispatch finished"
        );
        Ok(report)
    }

    async fn send(&self, recipient: RecipientId, message: &str) -> SendOutcome {
        let result = match self.settings.target {
            TargetKind::Group => self.transport.send_group_message(recipient, message).await,
            TargetKind::Direct => self.transport.send_private_message(recipient, message).await,
        };
        match result {
            Ok(body) => {
                tracing::info!(%recipient, target = %self.settings.target, message, response = %body, "Message sent");
                SendOutcome::Delivered(body)
            }
            Err(e) => {
                tracing::warn!(%recipient, target = %self.settings.target, transport = self.transport.name(), "Send failed: {e}");
                SendOutcome::Failed(e.to_string())
            }
        }
    }

    fn record(&self, original_list: &Path, recipient: RecipientId, outcome: &SendOutcome) {
        match self
            .ledger
            .record_outcome(original_list, recipient, &outcome.ledger_text(), &timestamp_now())
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!(%recipient, "Recipient missing from ledger, outcome not persisted"),
            Err(e) => tracing::error!(%recipient, ledger = %self.ledger.path().display(), "Failed to record outcome: {e}"),
        }
    }

    /// Sleep for the configured delay. Returns `false` if cancelled meanwhile.
    async fn pause(&self) -> bool {
        if self.settings.delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.delay) => true,
        }
    }
}
