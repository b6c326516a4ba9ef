//! Terminal card for a single prediction.

use std::fmt::Write;

use sentibox_ai::Prediction;
use sentibox_core::{LabelPolicy, Sentiment};

const BAR_WIDTH: usize = 30;
const MAX_TEXT_CHARS: usize = 60;

/// Render a prediction as a short vertical card.
pub fn prediction_card(text: &str, prediction: &Prediction, policy: LabelPolicy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} {} ===", prediction.label, emoji(prediction.label));
    let _ = writeln!(out, "{}", shorten(text, MAX_TEXT_CHARS));
    out.push('\n');
    let _ = writeln!(out, "  {:<14} {:.3}", "probability", prediction.probability);
    let _ = writeln!(out, "  {:<14} {}", "", bar(prediction.probability));
    let bands = if policy.has_neutral() { "3-way" } else { "2-way" };
    let _ = writeln!(out, "  {:<14} {} ({})", "policy", policy, bands);
    let _ = writeln!(
        out,
        "  {:<14} {}/{}",
        "known words", prediction.known_words, prediction.words
    );
    out
}

fn emoji(label: Sentiment) -> &'static str {
    match label {
        Sentiment::Positive => "😄",
        Sentiment::Negative => "😡",
        Sentiment::Neutral => "😐",
    }
}

/// `[#######-----------]` scaled to `BAR_WIDTH`.
fn bar(probability: f32) -> String {
    let filled = ((probability.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}
