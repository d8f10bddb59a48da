//! Message source — turns the operator's content argument into variants.

use broadcast_core::error::{BroadcastError, Result};

use crate::assets::TextAssetStore;

/// Separator between inline message variants.
pub const VARIANT_DELIMITER: &str = "||";

/// Resolve `content` into at least one message variant.
///
/// `name.txt` reads every line of asset `name`; anything else is split on
/// `||` with each piece trimmed.
pub fn resolve_messages(assets: &TextAssetStore, content: &str) -> Result<Vec<String>> {
    if let Some(name) = content.strip_suffix(".txt") {
        let lines = assets.get_lines(name)?;
        if lines.is_empty() {
            return Err(BroadcastError::EmptyMessages(content.to_string()));
        }
        tracing::info!(asset = %content, variants = lines.len(), "Message variants read from asset");
        return Ok(lines);
    }
    Ok(split_variants(content))
}

/// Split inline content on `||`, trimming every piece.
pub fn split_variants(content: &str) -> Vec<String> {
    content
        .split(VARIANT_DELIMITER)
        .map(|piece| piece.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_variants() {
        assert_eq!(split_variants("hi||there"), vec!["hi", "there"]);
        assert_eq!(split_variants(" hi || there "), vec!["hi", "there"]);
    }

    #[test]
    fn test_single_variant_is_trimmed() {
        assert_eq!(split_variants("  hello world \n"), vec!["hello world"]);
    }

    #[test]
    fn test_asset_lines_become_variants() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("promo.txt"), "first\nsecond\\nline\n").unwrap();
        let assets = TextAssetStore::open(dir.path()).unwrap();

        let variants = resolve_messages(&assets, "promo.txt").unwrap();
        assert_eq!(variants, vec!["first", "second\\nline"]);
    }

    #[test]
    fn test_missing_or_empty_asset_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();
        let assets = TextAssetStore::open(dir.path()).unwrap();

        assert!(matches!(
            resolve_messages(&assets, "empty.txt"),
            Err(BroadcastError::EmptyMessages(_))
        ));
        assert!(matches!(
            resolve_messages(&assets, "absent.txt"),
            Err(BroadcastError::AssetNotFound(_))
        ));
    }
}
