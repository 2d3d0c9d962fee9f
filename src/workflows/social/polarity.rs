//! Polarity scoring for short English posts.
//!
//! Scores come from the VADER lexicon and rules (negation, boosters, caps,
//! punctuation emphasis). Links and mentions are dropped first so handles and
//! URLs never count as words; hashtags keep their word.

use vader_sentiment::SentimentIntensityAnalyzer;

/// The post text with links and mentions removed and hashtags unwrapped.
fn cleaned(text: &str) -> String {
    text.split_whitespace()
        .filter(|raw| !raw.starts_with("http") && !raw.starts_with('@'))
        .map(|raw| raw.trim_start_matches('#').replace('\u{2019}', "'"))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Polarity of `text` in [-1, 1]; 0.0 when nothing in it carries sentiment.
pub fn polarity(text: &str) -> f64 {
    let cleaned = cleaned(text);
    if cleaned.is_empty() {
        return 0.0;
    }
    // The lexicon is loaded once by the crate; the analyzer only borrows it.
    SentimentIntensityAnalyzer::new()
        .polarity_scores(&cleaned)
        .get("compound")
        .copied()
        .unwrap_or(0.0)
        .clamp(-1.0, 1.0)
}
