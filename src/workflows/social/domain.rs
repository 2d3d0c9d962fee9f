use super::polarity::polarity;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            SentimentLabel::Positive
        } else if polarity < 0.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub text: String,
    pub polarity: f64,
    pub label: SentimentLabel,
}

impl Post {
    pub fn score(text: impl Into<String>) -> Self {
        let text = text.into();
        let polarity = polarity(&text);
        Self {
            text,
            polarity,
            label: SentimentLabel::from_polarity(polarity),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentShares {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentBreakdown {
    pub fn from_posts(posts: &[Post]) -> Self {
        posts
            .iter()
            .fold(Self::default(), |mut breakdown, post| {
                match post.label {
                    SentimentLabel::Positive => breakdown.positive += 1,
                    SentimentLabel::Negative => breakdown.negative += 1,
                    SentimentLabel::Neutral => breakdown.neutral += 1,
                }
                breakdown
            })
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    /// Percentages of the total; all zero when there are no posts.
    pub fn shares(&self) -> SentimentShares {
        let total = self.total();
        if total == 0 {
            return SentimentShares::default();
        }
        let pct = |count: usize| 100.0 * count as f64 / total as f64;
        SentimentShares {
            positive: pct(self.positive),
            negative: pct(self.negative),
            neutral: pct(self.neutral),
        }
    }
}
