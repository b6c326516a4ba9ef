//! Turns normalised words into the classifier's fixed-size input.

use sentibox_core::PadSide;

use crate::tokenizer::WordTokenizer;
use crate::word_vectors::WordVectors;

/// Fixed-size numeric representation of one text.
#[derive(Debug, Clone, PartialEq)]
pub enum Features {
    /// Word indices, padded/truncated to `maxlen`.
    Sequence(Vec<i64>),
    /// Averaged word vector.
    Dense(Vec<f32>),
}

impl Features {
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(v) => v.len(),
            Self::Dense(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values as `f32`, for models that take a float input.
    pub fn to_f32(&self) -> Vec<f32> {
        match self {
            Self::Sequence(v) => v.iter().map(|&x| x as f32).collect(),
            Self::Dense(v) => v.clone(),
        }
    }
}

/// Pad or truncate `seq` to exactly `maxlen` values, padding with 0.
///
/// `padding = Pre` prepends zeros, `Post` appends them. `truncating = Pre`
/// drops leading values, `Post` drops trailing ones.
pub fn pad_sequence(seq: &[i64], maxlen: usize, padding: PadSide, truncating: PadSide) -> Vec<i64> {
    let kept = if seq.len() > maxlen {
        match truncating {
            PadSide::Pre => &seq[seq.len() - maxlen..],
            PadSide::Post => &seq[..maxlen],
        }
    } else {
        seq
    };

    let fill = maxlen - kept.len();
    let mut out = Vec::with_capacity(maxlen);
    match padding {
        PadSide::Pre => {
            out.resize(fill, 0);
            out.extend_from_slice(kept);
        }
        PadSide::Post => {
            out.extend_from_slice(kept);
            out.resize(maxlen, 0);
        }
    }
    out
}

/// Tokenizer indices padded to a fixed length.
pub struct SequenceVectorizer {
    tokenizer: WordTokenizer,
    maxlen: usize,
    padding: PadSide,
    truncating: PadSide,
}

impl SequenceVectorizer {
    pub fn new(tokenizer: WordTokenizer, maxlen: usize, padding: PadSide, truncating: PadSide) -> Self {
        Self {
            tokenizer,
            maxlen,
            padding,
            truncating,
        }
    }

    pub fn maxlen(&self) -> usize {
        self.maxlen
    }

    pub fn tokenizer(&self) -> &WordTokenizer {
        &self.tokenizer
    }

    pub fn vectorize(&self, words: &[&str]) -> anyhow::Result<Vec<i64>> {
        let ids = self.tokenizer.encode(&words.join(" "))?;
        Ok(pad_sequence(&ids, self.maxlen, self.padding, self.truncating))
    }
}

/// The strategy selected at startup.
pub enum Vectorizer {
    Sequence(SequenceVectorizer),
    EmbeddingAverage(WordVectors),
}

impl Vectorizer {
    /// Exact width of every vector this vectorizer produces.
    pub fn width(&self) -> usize {
        match self {
            Self::Sequence(v) => v.maxlen(),
            Self::EmbeddingAverage(table) => table.dim(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequence(_) => "sequence",
            Self::EmbeddingAverage(_) => "embedding-average",
        }
    }

    pub fn vectorize(&self, words: &[&str]) -> anyhow::Result<Features> {
        match self {
            Self::Sequence(v) => Ok(Features::Sequence(v.vectorize(words)?)),
            Self::EmbeddingAverage(table) => Ok(Features::Dense(table.average(words.iter().copied()))),
        }
    }

    /// How many of `words` the vectorizer recognises.
    pub fn known_words(&self, words: &[&str]) -> usize {
        match self {
            Self::Sequence(v) => words
                .iter()
                .filter(|w| v.tokenizer().index_of(w).is_some())
                .count(),
            Self::EmbeddingAverage(table) => words.iter().filter(|w| table.contains(w)).count(),
        }
    }
}
