//! Outgoing text normalization.

/// Converts every operator spelling of "newline" into CRLF.
///
/// Real line feeds, the literal two-character `\n` and the URL-escaped `%0A`
/// all end up as `\r\n`. A lone `\r` that was already part of a CRLF pair is
/// dropped first so existing CRLFs are not doubled.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace("\\n", "\n")
        .replace("%0A", "\n")
        .replace('\n', "\r\n")
}

/// Strips line breaks so a value fits on a single ledger line.
pub fn single_line(text: &str) -> String {
    text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}
