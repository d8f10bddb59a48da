//! Per-campaign progress ledger.
//!
//! ```text
//! <dir>/<campaign>-save.txt
//!   123456                                            # pending
//!   234567 {"status":"ok","retcode":0} 2026-03-01 10:15:02   # settled
//!   345678 失败: connection refused 2026-03-01 10:15:12      # settled (failed)
//! ```
//!
//! A line is matched on its first whitespace-separated field, parsed as an
//! integer and compared with the recipient id (`007` is recipient 7, `12`
//! never matches `123`). A line is settled iff it contains
//! a `YYYY-MM-DD` date. The ledger is seeded from the campaign's original
//! recipient list on the first recorded outcome and rewritten whole on every
//! settlement (temp file + rename).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use broadcast_core::error::{BroadcastError, Result};
use broadcast_core::text::single_line;
use broadcast_core::types::RecipientId;
use regex::Regex;

static DATE_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("date pattern is valid"));

/// Format used for the settlement timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in ledger format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Counts over the ledger's lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    pub total: usize,
    pub settled: usize,
}

impl LedgerSummary {
    pub fn pending(&self) -> usize {
        self.total - self.settled
    }
}

/// Durable record of which recipients a campaign has already handled.
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    dir: PathBuf,
    campaign: String,
}

impl ProgressLedger {
    pub fn new(dir: impl Into<PathBuf>, campaign: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            campaign: campaign.into(),
        }
    }

    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    /// `<dir>/<campaign>-save.txt`
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}-save.txt", self.campaign))
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Whether `recipient` already has a date-stamped outcome.
    ///
    /// A missing ledger is not an error: nothing has been recorded yet.
    pub fn is_settled(&self, recipient: RecipientId) -> Result<bool> {
        let path = self.path();
        if !path.exists() {
            return Ok(false);
        }
        let lines = read_lines(&path)?;
        Ok(lines
            .iter()
            .find(|line| line_matches(line, recipient))
            .is_some_and(|line| is_settled_line(line)))
    }

    /// Append ` <outcome> <timestamp>` to the recipient's line.
    ///
    /// Seeds the ledger from `original_list` if it does not exist yet.
    /// Returns `false` if no line matched (nothing is written in that case).
    pub fn record_outcome(
        &self,
        original_list: &Path,
        recipient: RecipientId,
        outcome: &str,
        timestamp: &str,
    ) -> Result<bool> {
        self.seed_from(original_list)?;

        let path = self.path();
        let mut lines = read_lines(&path)?;
        let Some(line) = lines.iter_mut().find(|line| line_matches(line, recipient)) else {
            tracing::debug!(%recipient, ledger = %path.display(), "Recipient not in ledger, outcome not recorded");
            return Ok(false);
        };
        line.push(' ');
        line.push_str(&single_line(outcome));
        line.push(' ');
        line.push_str(timestamp);

        self.write_lines(&lines)?;
        Ok(true)
    }

    /// Total and settled line counts; zero if the ledger does not exist.
    pub fn summary(&self) -> Result<LedgerSummary> {
        let path = self.path();
        if !path.exists() {
            return Ok(LedgerSummary::default());
        }
        let lines = read_lines(&path)?;
        let mut summary = LedgerSummary::default();
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            summary.total += 1;
            if is_settled_line(line) {
                summary.settled += 1;
            }
        }
        Ok(summary)
    }

    /// Copy every line of `original_list` into a fresh ledger, unless one exists.
    fn seed_from(&self, original_list: &Path) -> Result<()> {
        if self.exists() {
            return Ok(());
        }
        let lines = read_lines(original_list).map_err(|e| {
            BroadcastError::Ledger(format!(
                "failed to open original list {}: {e}",
                original_list.display()
            ))
        })?;
        self.write_lines(&lines)?;
        tracing::info!(
            ledger = %self.path().display(),
            source = %original_list.display(),
            lines = lines.len(),
            "Progress ledger created"
        );
        Ok(())
    }

    /// Replace the ledger atomically: write a sibling temp file, then rename.
    fn write_lines(&self, lines: &[String]) -> Result<()> {
        let path = self.path();
        let tmp = self.dir.join(format!(".{}-save.tmp", self.campaign));
        {
            let mut file = std::io::BufWriter::new(std::fs::File::create(&tmp)?);
            for line in lines {
                writeln!(file, "{line}")?;
            }
            let file = file
                .into_inner()
                .map_err(|e| BroadcastError::Ledger(format!("flush {}: {e}", tmp.display())))?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path).map_err(|e| {
            BroadcastError::Ledger(format!("failed to replace {}: {e}", path.display()))
        })?;
        Ok(())
    }
}

/// First field of `line` parses to `recipient`.
pub fn line_matches(line: &str, recipient: RecipientId) -> bool {
    line.split_whitespace()
        .next()
        .and_then(|field| field.parse::<RecipientId>().ok())
        == Some(recipient)
}

/// Line carries a `YYYY-MM-DD` date.
pub fn is_settled_line(line: &str) -> bool {
    DATE_STAMP.is_match(line)
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(ids: &str) -> (tempfile::TempDir, ProgressLedger, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("1700000000-spring.txt");
        std::fs::write(&original, ids).unwrap();
        let ledger = ProgressLedger::new(dir.path(), "spring");
        (dir, ledger, original)
    }

    #[test]
    fn test_missing_ledger_is_not_settled() {
        let (_dir, ledger, _) = setup("1\n2\n");
        assert!(!ledger.exists());
        assert!(!ledger.is_settled(RecipientId(1)).unwrap());
    }

    #[test]
    fn test_first_record_seeds_from_original() {
        let (_dir, ledger, original) = setup("11\n22\n33\n");
        let updated = ledger
            .record_outcome(&original, RecipientId(22), "{\"status\":\"ok\"}", "2026-03-01 10:00:00")
            .unwrap();
        assert!(updated);

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(
            content,
            "11\n22 {\"status\":\"ok\"} 2026-03-01 10:00:00\n33\n"
        );
        assert!(ledger.is_settled(RecipientId(22)).unwrap());
        assert!(!ledger.is_settled(RecipientId(11)).unwrap());
        assert_eq!(ledger.summary().unwrap(), LedgerSummary { total: 3, settled: 1 });
    }

    #[test]
    fn test_outcome_newlines_stripped() {
        let (_dir, ledger, original) = setup("5\n");
        ledger
            .record_outcome(&original, RecipientId(5), "失败: line one\nline two", "2026-03-01 10:00:00")
            .unwrap();
        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("5 失败: line oneline two 2026-03-01"));
    }

    #[test]
    fn test_numeric_prefix_ids_do_not_collide() {
        let (_dir, ledger, original) = setup("123\n12\n");
        ledger
            .record_outcome(&original, RecipientId(12), "ok", "2026-03-01 10:00:00")
            .unwrap();
        assert!(ledger.is_settled(RecipientId(12)).unwrap());
        assert!(!ledger.is_settled(RecipientId(123)).unwrap());

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content, "123\n12 ok 2026-03-01 10:00:00\n");
    }

    #[test]
    fn test_zero_padded_and_signed_ids_settle() {
        let (_dir, ledger, original) = setup("007
+8
9
");
        assert!(ledger
            .record_outcome(&original, RecipientId(7), "ok", "2026-03-01 10:00:00")
            .unwrap());
        assert!(ledger
            .record_outcome(&original, RecipientId(8), "ok", "2026-03-01 10:00:10")
            .unwrap());
        assert!(ledger.is_settled(RecipientId(7)).unwrap());
        assert!(ledger.is_settled(RecipientId(8)).unwrap());
        assert!(!ledger.is_settled(RecipientId(9)).unwrap());

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(
            content,
            "007 ok 2026-03-01 10:00:00\n+8 ok 2026-03-01 10:00:10\n9\n"
        );
    }

    #[test]
    fn test_line_matches_compares_numerically() {
        assert!(line_matches("007 ok 2026-03-01", RecipientId(7)));
        assert!(line_matches("12", RecipientId(12)));
        assert!(!line_matches("123 ok", RecipientId(12)));
        assert!(!line_matches("abc", RecipientId(0)));
        assert!(!line_matches("", RecipientId(0)));
    }

    #[test]
    fn test_unknown_recipient_is_noop() {
        let (_dir, ledger, original) = setup("1\n");
        let updated = ledger
            .record_outcome(&original, RecipientId(99), "ok", "2026-03-01 10:00:00")
            .unwrap();
        assert!(!updated);
        assert_eq!(std::fs::read_to_string(ledger.path()).unwrap(), "1\n");
    }

    #[test]
    fn test_existing_ledger_is_not_reseeded() {
        let (_dir, ledger, original) = setup("1\n2\n");
        ledger
            .record_outcome(&original, RecipientId(1), "ok", "2026-03-01 10:00:00")
            .unwrap();
        std::fs::write(&original, "1\n2\n3\n").unwrap();
        ledger
            .record_outcome(&original, RecipientId(2), "ok", "2026-03-01 10:00:10")
            .unwrap();
        assert_eq!(ledger.summary().unwrap(), LedgerSummary { total: 2, settled: 2 });
    }

    #[test]
    fn test_externally_settled_line_counts() {
        let (dir, ledger, _) = setup("");
        std::fs::write(dir.path().join("spring-save.txt"), "7 manual 2025-12-31\n8\n").unwrap();
        assert!(ledger.is_settled(RecipientId(7)).unwrap());
        assert!(!ledger.is_settled(RecipientId(8)).unwrap());
    }

    #[test]
    fn test_missing_original_list_is_ledger_error() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ProgressLedger::new(dir.path(), "nope");
        let err = ledger
            .record_outcome(&dir.path().join("missing.txt"), RecipientId(1), "ok", "2026-03-01 10:00:00")
            .unwrap_err();
        assert!(matches!(err, BroadcastError::Ledger(_)));
        assert!(!ledger.exists());
    }

    #[test]
    fn test_timestamp_format_is_date_shaped() {
        assert!(is_settled_line(&format!("1 ok {}", timestamp_now())));
    }
}
