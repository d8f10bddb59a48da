//! Recipient source — resolves the ordered target set for a campaign.
//!
//! Either the backend roster (optionally reduced to one sub-channel per
//! channel) snapshotted to `<unix_ts>-<campaign>.txt`, or an existing
//! recipient-list asset. Shuffling only reorders; it runs after filtering.

use std::io::Write;
use std::path::{Path, PathBuf};

use broadcast_core::error::Result;
use broadcast_core::traits::Transport;
use broadcast_core::types::{RecipientId, RosterEntry, TargetKind};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::assets::TextAssetStore;

/// Name prefix marking a parent channel in a guild roster.
pub const CONTAINER_MARKER: char = '*';
/// Name prefix marking a sub-channel of the preceding parent.
pub const MEMBER_MARKER: char = '&';

/// Where recipients come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientMode {
    /// Query the backend roster for `kind`.
    Backend { kind: TargetKind, filter_channels: bool },
    /// Read a recipient-list asset by name.
    Asset { name: String },
}

/// Resolved target set plus the file that seeds the campaign's ledger.
#[derive(Debug, Clone)]
pub struct ResolvedRecipients {
    pub ids: Vec<RecipientId>,
    pub original_list: PathBuf,
}

/// Resolve the campaign's recipients. Any failure aborts before sending.
pub async fn resolve_recipients<R: Rng>(
    transport: &dyn Transport,
    assets: &TextAssetStore,
    campaign: &str,
    mode: &RecipientMode,
    shuffle: bool,
    rng: &mut R,
) -> Result<ResolvedRecipients> {
    match mode {
        RecipientMode::Backend {
            kind,
            filter_channels: filter,
        } => {
            let roster = match kind {
                TargetKind::Group => transport.group_roster().await?,
                TargetKind::Direct => transport.friend_roster().await?,
            };
            let mut ids = if *filter && *kind == TargetKind::Group {
                filter_channels(&roster)
            } else {
                if *filter {
                    tracing::debug!("Channel filter only applies to group rosters, ignoring");
                }
                roster.iter().map(|e| e.id).collect()
            };
            if shuffle {
                ids.shuffle(rng);
            }
            let original_list = write_snapshot(assets.dir(), campaign, &ids)?;
            tracing::info!(
                kind = %kind,
                roster = roster.len(),
                recipients = ids.len(),
                snapshot = %original_list.display(),
                "Roster snapshot saved"
            );
            Ok(ResolvedRecipients { ids, original_list })
        }
        RecipientMode::Asset { name } => {
            let lines = assets.get_lines(name)?;
            let mut ids = parse_recipient_lines(name, &lines);
            if shuffle {
                ids.shuffle(rng);
            }
            tracing::info!(asset = %name, recipients = ids.len(), "Recipient list read from asset");
            Ok(ResolvedRecipients {
                ids,
                original_list: assets.path_of(name),
            })
        }
    }
}

/// Keep one representative sub-channel per parent channel.
///
/// Unnamed entries always pass. A `*` entry opens a search and the first
/// following `&` entry is taken; later siblings are dropped. An unnamed
/// entry also closes an open search.
pub fn filter_channels(roster: &[RosterEntry]) -> Vec<RecipientId> {
    let mut ids = Vec::new();
    let mut looking_for_member = false;

    for entry in roster {
        let name = entry.name.trim();
        if name.is_empty() {
            ids.push(entry.id);
            looking_for_member = false;
        } else if name.starts_with(CONTAINER_MARKER) {
            tracing::debug!(id = %entry.id, name, "Channel found");
            looking_for_member = true;
        } else if looking_for_member && name.starts_with(MEMBER_MARKER) {
            tracing::debug!(id = %entry.id, name, "First sub-channel selected");
            ids.push(entry.id);
            looking_for_member = false;
        }
    }
    ids
}

/// Parse one id per line; blank lines are skipped, bad lines logged and dropped.
pub fn parse_recipient_lines(source: &str, lines: &[String]) -> Vec<RecipientId> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter_map(|line| match line.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(source, line, "Invalid recipient id: {e}");
                None
            }
        })
        .collect()
}

/// Write `<dir>/<unix_ts>-<campaign>.txt`, one id per line.
fn write_snapshot(dir: &Path, campaign: &str, ids: &[RecipientId]) -> Result<PathBuf> {
    let path = dir.join(format!("{}-{campaign}.txt", chrono::Utc::now().timestamp()));
    let mut file = std::io::BufWriter::new(std::fs::File::create(&path)?);
    for id in ids {
        writeln!(file, "{id}")?;
    }
    file.flush()?;
    Ok(path)
}
