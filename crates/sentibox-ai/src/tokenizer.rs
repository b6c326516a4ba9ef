//! Word-index tokenizer for the sequence strategy.
//!
//! Two artifact formats are accepted:
//!
//! - a Keras `Tokenizer.to_json()` document (`class_name: "Tokenizer"`), whose
//!   `word_index` is converted into a word-level Hugging Face tokenizer;
//! - a native Hugging Face `tokenizer.json`.
//!
//! Unknown words are dropped from the output sequence unless the artifact
//! declares an out-of-vocabulary token, in which case they map to its index.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Value, json};
use tokenizers::Tokenizer;
use tracing::info;

/// Placeholder unknown token inserted at index 0, which Keras reserves for padding.
const UNK_PLACEHOLDER: &str = "[UNK]";

/// Candidate unknown tokens probed in native tokenizer files.
const NATIVE_UNK_TOKENS: &[&str] = &["[UNK]", "<unk>", "<UNK>"];

#[derive(Deserialize)]
struct KerasTokenizerJson {
    config: KerasTokenizerConfig,
}

#[derive(Deserialize)]
struct KerasTokenizerConfig {
    #[serde(default)]
    num_words: Option<usize>,
    #[serde(default)]
    oov_token: Option<String>,
    /// Keras stores this as a JSON-encoded string; plain objects are accepted too.
    word_index: Value,
}

/// Maps words to integer indices with an explicit out-of-vocabulary policy.
pub struct WordTokenizer {
    tokenizer: Tokenizer,
    /// Id the underlying model emits for unknown words.
    unk_id: Option<u32>,
    /// Id unknown words are replaced with; `None` drops them.
    oov_id: Option<u32>,
    /// Only indices below this bound are kept (Keras `num_words`).
    num_words: Option<usize>,
}

impl WordTokenizer {
    /// Load a tokenizer artifact from disk, detecting its format.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        anyhow::ensure!(path.exists(), "tokenizer not found at {}", path.display());
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading tokenizer {}", path.display()))?;
        let tokenizer = Self::from_json(&raw)
            .with_context(|| format!("parsing tokenizer {}", path.display()))?;
        info!(
            vocab = tokenizer.vocab_size(),
            num_words = ?tokenizer.num_words,
            oov = tokenizer.oov_id.is_some(),
            path = %path.display(),
            "loaded tokenizer"
        );
        Ok(tokenizer)
    }

    /// Parse either tokenizer format from a JSON string.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(raw).context("tokenizer is not valid JSON")?;
        if value.get("class_name").and_then(Value::as_str) == Some("Tokenizer") {
            let keras: KerasTokenizerJson = serde_json::from_value(value)?;
            Self::from_keras(keras.config)
        } else {
            let tokenizer = Tokenizer::from_str(raw)
                .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
            let unk_id = NATIVE_UNK_TOKENS
                .iter()
                .find_map(|t| tokenizer.token_to_id(t));
            Ok(Self {
                tokenizer,
                unk_id,
                oov_id: None,
                num_words: None,
            })
        }
    }

    /// Build from an in-memory word index (index 0 is reserved for padding).
    pub fn from_word_index(
        word_index: BTreeMap<String, u32>,
        oov_token: Option<String>,
        num_words: Option<usize>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !word_index.values().any(|&id| id == 0),
            "word index 0 is reserved for padding"
        );

        let (unk_token, oov_id) = match oov_token {
            Some(token) => {
                let id = *word_index
                    .get(&token)
                    .ok_or_else(|| anyhow::anyhow!("oov token '{token}' missing from word_index"))?;
                (token, Some(id))
            }
            None => (UNK_PLACEHOLDER.to_string(), None),
        };

        let mut vocab = word_index;
        vocab.entry(unk_token.clone()).or_insert(0);
        let unk_id = vocab.get(&unk_token).copied();

        // Words arrive already normalised, so no normaliser is attached.
        let doc = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": unk_token,
            },
        });
        let tokenizer = Tokenizer::from_str(&doc.to_string())
            .map_err(|e| anyhow::anyhow!("build word-level tokenizer: {e}"))?;

        Ok(Self {
            tokenizer,
            unk_id,
            oov_id,
            num_words,
        })
    }

    fn from_keras(config: KerasTokenizerConfig) -> anyhow::Result<Self> {
        let word_index: BTreeMap<String, u32> = match config.word_index {
            Value::String(encoded) => {
                serde_json::from_str(&encoded).context("decoding keras word_index")?
            }
            other => serde_json::from_value(other).context("decoding keras word_index")?,
        };
        Self::from_word_index(word_index, config.oov_token, config.num_words)
    }

    /// Number of entries in the vocabulary, including any unknown placeholder.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Index of a single word, if it is in the vocabulary.
    pub fn index_of(&self, word: &str) -> Option<u32> {
        self.tokenizer
            .token_to_id(word)
            .filter(|&id| Some(id) != self.unk_id && self.within_num_words(id))
    }

    fn within_num_words(&self, id: u32) -> bool {
        self.num_words.is_none_or(|n| (id as usize) < n)
    }

    /// Convert normalised text into word indices, applying the OOV policy.
    pub fn encode(&self, text: &str) -> anyhow::Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let ids = encoding
            .get_ids()
            .iter()
            .filter_map(|&id| {
                let known = Some(id) != self.unk_id && self.within_num_words(id);
                if known { Some(id) } else { self.oov_id }
            })
            .map(i64::from)
            .collect();
        Ok(ids)
    }
}
