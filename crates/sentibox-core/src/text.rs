//! Text normalisation ahead of vectorization.
//!
//! Input text is reduced to lowercase ASCII letters and whitespace, then
//! split on whitespace. There is no stemming and no stop-word removal;
//! characters from non-ASCII scripts are deleted entirely.

/// Normalise free text: keep ASCII letters and whitespace, lowercase the rest.
///
/// "I LOVE this!!! 😄" → "i love this "
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Split already-normalised text into words.
pub fn words(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
