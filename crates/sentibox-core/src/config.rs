//! Pipeline configuration shared by the loader, the server, and the CLI.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LabelPolicy;

/// Sequence length fed to the classifier by the sequence strategy.
pub const DEFAULT_MAXLEN: usize = 100;
/// Width of the pretrained word vectors used by the embedding-average strategy.
pub const DEFAULT_EMBEDDING_DIM: usize = 300;
/// Hosted copy of the GoogleNews word2vec vectors.
pub const DEFAULT_WORD_VECTORS_URL: &str =
    "https://s3.amazonaws.com/dl4j-distribution/GoogleNews-vectors-negative300.bin.gz";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown {field} '{value}' (expected one of: {expected})")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("dimension mismatch: {source_name} produces {actual} values, {target} expects {expected}")]
    DimensionMismatch {
        source_name: &'static str,
        actual: usize,
        target: &'static str,
        expected: usize,
    },
}

/// How text is turned into the classifier's fixed-size input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Tokenizer indices padded/truncated to `maxlen`.
    #[default]
    Sequence,
    /// Mean of pretrained word vectors for in-vocabulary words.
    EmbeddingAverage,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::EmbeddingAverage => "embedding-average",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequence" => Ok(Self::Sequence),
            "embedding-average" | "embedding" => Ok(Self::EmbeddingAverage),
            _ => Err(ConfigError::UnknownValue {
                field: "strategy",
                value: s.to_string(),
                expected: "sequence, embedding-average",
            }),
        }
    }
}

/// Which end of a sequence receives padding or loses elements on truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadSide {
    #[default]
    Pre,
    Post,
}

impl PadSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for PadSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PadSide {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            _ => Err(ConfigError::UnknownValue {
                field: "side",
                value: s.to_string(),
                expected: "pre, post",
            }),
        }
    }
}

/// Fully resolved pipeline configuration.
///
/// Built by the CLI from flags and environment variables; serialisable so the
/// effective configuration can be logged as JSON at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    pub policy: LabelPolicy,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub word_vectors_path: PathBuf,
    pub word_vectors_url: String,
    /// Cap on word-vector rows read from disk (`None` reads the whole table).
    pub max_words: Option<usize>,
    pub maxlen: usize,
    pub embedding_dim: usize,
    pub padding: PadSide,
    pub truncating: PadSide,
    /// Abort startup when artifacts fail to load. When false the server runs
    /// without a pipeline and every prediction returns the error payload.
    pub require_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            policy: LabelPolicy::default(),
            model_path: PathBuf::from("models/sentiment/model.onnx"),
            tokenizer_path: PathBuf::from("models/sentiment/tokenizer.json"),
            word_vectors_path: PathBuf::from("models/GoogleNews-vectors-negative300.bin"),
            word_vectors_url: DEFAULT_WORD_VECTORS_URL.to_string(),
            max_words: None,
            maxlen: DEFAULT_MAXLEN,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            padding: PadSide::Pre,
            truncating: PadSide::Pre,
            require_artifacts: true,
        }
    }
}

impl PipelineConfig {
    /// Width of the vector handed to the classifier under the active strategy.
    pub fn input_width(&self) -> usize {
        match self.strategy {
            Strategy::Sequence => self.maxlen,
            Strategy::EmbeddingAverage => self.embedding_dim,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.maxlen == 0 {
            return Err(ConfigError::Zero { field: "maxlen" });
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::Zero {
                field: "embedding_dim",
            });
        }
        if self.max_words == Some(0) {
            return Err(ConfigError::Zero { field: "max_words" });
        }
        Ok(())
    }
}
