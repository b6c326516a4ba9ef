//! Command-line interface. Every pipeline flag has a `SENTIBOX_*` environment
//! equivalent; the bind address follows the usual `HOST` / `PORT` variables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sentibox_core::{LabelPolicy, PadSide, PipelineConfig, Strategy};
use sentibox_core::config::{DEFAULT_EMBEDDING_DIM, DEFAULT_MAXLEN, DEFAULT_WORD_VECTORS_URL};

#[derive(Parser, Debug)]
#[command(name = "sentibox")]
#[command(version, about = "Sentiment analysis chat demo", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the model and serve the chat page and prediction endpoint
    Serve(ServeArgs),
    /// Classify one text and print the result
    Predict(PredictArgs),
    /// Download the word-vector table if it is missing
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Worker threads (defaults to one per core)
    #[arg(long, env = "SENTIBOX_WORKERS")]
    pub workers: Option<usize>,

    /// Start even when artifacts fail to load; predictions then return 503
    #[arg(long, env = "SENTIBOX_ALLOW_MISSING_ARTIFACTS")]
    pub allow_missing_artifacts: bool,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Text to classify
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Print the `/predict` response body instead of a card
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Flags shared by every subcommand that touches artifacts.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Vectorization strategy: sequence or embedding-average
    #[arg(long, env = "SENTIBOX_STRATEGY", default_value_t = Strategy::Sequence)]
    pub strategy: Strategy,

    /// Threshold policy: binary-50, wide-60-40 or wide-65-35
    #[arg(long, env = "SENTIBOX_POLICY", default_value_t = LabelPolicy::Wide65_35)]
    pub policy: LabelPolicy,

    /// ONNX classifier
    #[arg(long, env = "SENTIBOX_MODEL", default_value = "models/sentiment/model.onnx")]
    pub model: PathBuf,

    /// Tokenizer JSON (Keras or Hugging Face)
    #[arg(long, env = "SENTIBOX_TOKENIZER", default_value = "models/sentiment/tokenizer.json")]
    pub tokenizer: PathBuf,

    /// Word-vector table (.bin, .txt or .vec, optionally gzipped)
    #[arg(
        long,
        env = "SENTIBOX_WORD_VECTORS",
        default_value = "models/GoogleNews-vectors-negative300.bin"
    )]
    pub word_vectors: PathBuf,

    /// Where to download the word-vector table from when it is missing
    #[arg(long, env = "SENTIBOX_WORD_VECTORS_URL", default_value = DEFAULT_WORD_VECTORS_URL)]
    pub word_vectors_url: String,

    /// Read at most this many word-vector rows
    #[arg(long, env = "SENTIBOX_MAX_WORDS")]
    pub max_words: Option<usize>,

    /// Sequence length fed to the classifier
    #[arg(long, env = "SENTIBOX_MAXLEN", default_value_t = DEFAULT_MAXLEN)]
    pub maxlen: usize,

    /// Word-vector dimension
    #[arg(long, env = "SENTIBOX_EMBEDDING_DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Where padding zeros go: pre or post
    #[arg(long, env = "SENTIBOX_PADDING", default_value_t = PadSide::Pre)]
    pub padding: PadSide,

    /// Which end long sequences are cut from: pre or post
    #[arg(long, env = "SENTIBOX_TRUNCATING", default_value_t = PadSide::Pre)]
    pub truncating: PadSide,
}

impl PipelineArgs {
    pub fn to_config(&self, require_artifacts: bool) -> PipelineConfig {
        PipelineConfig {
            strategy: self.strategy,
            policy: self.policy,
            model_path: self.model.clone(),
            tokenizer_path: self.tokenizer.clone(),
            word_vectors_path: self.word_vectors.clone(),
            word_vectors_url: self.word_vectors_url.clone(),
            max_words: self.max_words,
            maxlen: self.maxlen,
            embedding_dim: self.embedding_dim,
            padding: self.padding,
            truncating: self.truncating,
            require_artifacts,
        }
    }
}
