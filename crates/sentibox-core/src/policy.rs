//! Threshold policies mapping a classifier probability to a sentiment label.
//!
//! The cutoffs are literal values carried over from the deployed chatbox
//! variants and must be preserved exactly, including which side of each
//! comparison is strict.
//!
//! | Policy        | Positive  | Negative  | Neutral          |
//! |---------------|-----------|-----------|------------------|
//! | `binary-50`   | p > 0.5   | p <= 0.5  | never            |
//! | `wide-60-40`  | p > 0.6   | p < 0.4   | 0.4 <= p <= 0.6  |
//! | `wide-65-35`  | p >= 0.65 | p <= 0.35 | otherwise        |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Sentiment label returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold policy selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelPolicy {
    /// Two-way split at 0.5.
    #[serde(rename = "binary-50")]
    Binary50,
    /// Three-way split with a neutral band of [0.4, 0.6].
    #[serde(rename = "wide-60-40")]
    Wide60_40,
    /// Three-way split: positive from 0.65, negative up to 0.35.
    #[default]
    #[serde(rename = "wide-65-35")]
    Wide65_35,
}

impl LabelPolicy {
    pub const ALL: [LabelPolicy; 3] = [Self::Binary50, Self::Wide60_40, Self::Wide65_35];

    /// Map a probability to a label. Pure function of `p`.
    pub fn label(&self, p: f32) -> Sentiment {
        match self {
            Self::Binary50 => {
                if p > 0.5 {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                }
            }
            Self::Wide60_40 => {
                if p > 0.6 {
                    Sentiment::Positive
                } else if p < 0.4 {
                    Sentiment::Negative
                } else {
                    Sentiment::Neutral
                }
            }
            Self::Wide65_35 => {
                if p >= 0.65 {
                    Sentiment::Positive
                } else if p <= 0.35 {
                    Sentiment::Negative
                } else {
                    Sentiment::Neutral
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary50 => "binary-50",
            Self::Wide60_40 => "wide-60-40",
            Self::Wide65_35 => "wide-65-35",
        }
    }

    /// Whether the policy can produce [`Sentiment::Neutral`].
    pub fn has_neutral(&self) -> bool {
        !matches!(self, Self::Binary50)
    }
}

impl fmt::Display for LabelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownValue {
                field: "policy",
                value: s.to_string(),
                expected: "binary-50, wide-60-40, wide-65-35",
            })
    }
}
