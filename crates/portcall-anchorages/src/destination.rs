/// Declared destinations that carry no information
///
/// Compared after normalization, so casing and surrounding junk don't matter.
const NOISE_TOKENS: &[&str] = &[
    "0",
    "NA",
    "N/A",
    "NIL",
    "NONE",
    "NOT AVAILABLE",
    "NULL",
    "TEST",
    "UNKNOWN",
];

/// Normalize a free-text declared destination, or reject it as noise
///
/// Strips surrounding whitespace and punctuation, upper-cases, and collapses internal whitespace
/// runs. Returns `None` for empty results, strings with no alphanumeric content, and the curated
/// noise tokens.
pub fn normalize_destination(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    let normalized = trimmed
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if !normalized.chars().any(char::is_alphanumeric) {
        return None;
    }
    if NOISE_TOKENS.contains(&normalized.as_str()) {
        return None;
    }
    Some(normalized)
}
