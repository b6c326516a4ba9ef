//! Text → label inference pipeline.
//!
//! normalise → vectorize → forward pass → threshold. Built once at startup
//! and shared read-only across requests.

use sentibox_core::{ConfigError, LabelPolicy, PipelineConfig, Sentiment, Strategy, normalize, words};
use tracing::debug;

use crate::classifier::Classifier;
use crate::tokenizer::WordTokenizer;
use crate::vectorizer::{SequenceVectorizer, Vectorizer};
use crate::word_vectors::WordVectors;

/// Result of classifying one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Sentiment,
    /// Classifier output, clamped to [0, 1].
    pub probability: f32,
    /// Number of words left after normalisation.
    pub words: usize,
    /// How many of those words the vectorizer recognised.
    pub known_words: usize,
}

pub struct SentimentPipeline {
    vectorizer: Vectorizer,
    classifier: Box<dyn Classifier>,
    policy: LabelPolicy,
}

impl SentimentPipeline {
    /// Assemble a pipeline, rejecting a vectorizer whose width differs from
    /// the width the classifier declares.
    pub fn new(
        vectorizer: Vectorizer,
        classifier: Box<dyn Classifier>,
        policy: LabelPolicy,
    ) -> anyhow::Result<Self> {
        if let Some(expected) = classifier.input_width()
            && expected != vectorizer.width()
        {
            return Err(ConfigError::DimensionMismatch {
                source_name: vectorizer.name(),
                actual: vectorizer.width(),
                target: "classifier",
                expected,
            }
            .into());
        }
        Ok(Self {
            vectorizer,
            classifier,
            policy,
        })
    }

    pub fn policy(&self) -> LabelPolicy {
        self.policy
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Classify one text. Empty or fully-filtered text still runs a forward
    /// pass on the all-zero representation.
    pub fn predict(&self, text: &str) -> anyhow::Result<Prediction> {
        let normalized = normalize(text);
        let words = words(&normalized);
        let features = self.vectorizer.vectorize(&words)?;
        anyhow::ensure!(
            features.len() == self.vectorizer.width(),
            "vectorizer produced {} values, expected {}",
            features.len(),
            self.vectorizer.width()
        );

        let raw = self.classifier.predict(&features)?;
        anyhow::ensure!(raw.is_finite(), "classifier returned non-finite output {raw}");
        let probability = raw.clamp(0.0, 1.0);
        let label = self.policy.label(probability);

        let prediction = Prediction {
            label,
            probability,
            words: words.len(),
            known_words: self.vectorizer.known_words(&words),
        };
        debug!(
            label = %prediction.label,
            probability = prediction.probability,
            words = prediction.words,
            known = prediction.known_words,
            "prediction"
        );
        Ok(prediction)
    }
}

/// Load the vectorizer for the configured strategy.
pub fn load_vectorizer(config: &PipelineConfig) -> anyhow::Result<Vectorizer> {
    config.validate()?;
    match config.strategy {
        Strategy::Sequence => {
            let tokenizer = WordTokenizer::load(&config.tokenizer_path)?;
            Ok(Vectorizer::Sequence(SequenceVectorizer::new(
                tokenizer,
                config.maxlen,
                config.padding,
                config.truncating,
            )))
        }
        Strategy::EmbeddingAverage => {
            let table = WordVectors::load(&config.word_vectors_path, config.max_words)?;
            if table.dim() != config.embedding_dim {
                return Err(ConfigError::DimensionMismatch {
                    source_name: "word vectors",
                    actual: table.dim(),
                    target: "embedding_dim",
                    expected: config.embedding_dim,
                }
                .into());
            }
            Ok(Vectorizer::EmbeddingAverage(table))
        }
    }
}

/// Load every artifact named by `config` and assemble the pipeline.
#[cfg(feature = "onnx")]
pub fn load_pipeline(config: &PipelineConfig) -> anyhow::Result<SentimentPipeline> {
    let vectorizer = load_vectorizer(config)?;
    let classifier = crate::classifier::OnnxClassifier::load(&config.model_path)?;
    SentimentPipeline::new(vectorizer, Box::new(classifier), config.policy)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use sentibox_core::PadSide;

    use super::*;
    use crate::vectorizer::Features;

    /// Returns a fixed output and remembers the last input it saw.
    struct Recording {
        output: f32,
        width: Option<usize>,
        seen: Mutex<Option<Features>>,
    }

    impl Recording {
        fn new(output: f32, width: Option<usize>) -> Self {
            Self {
                output,
                width,
                seen: Mutex::new(None),
            }
        }
    }

    impl Classifier for Recording {
        fn input_width(&self) -> Option<usize> {
            self.width
        }

        fn predict(&self, features: &Features) -> anyhow::Result<f32> {
            *self.seen.lock().unwrap() = Some(features.clone());
            Ok(self.output)
        }
    }

    fn sequence_vectorizer() -> Vectorizer {
        let index: BTreeMap<String, u32> = [("i", 1), ("love", 2), ("this", 3)]
            .into_iter()
            .map(|(w, i)| (w.to_string(), i))
            .collect();
        let tokenizer = WordTokenizer::from_word_index(index, None, None).unwrap();
        Vectorizer::Sequence(SequenceVectorizer::new(tokenizer, 100, PadSide::Pre, PadSide::Pre))
    }

    fn embedding_vectorizer() -> Vectorizer {
        let table = WordVectors::from_entries(
            4,
            vec![("love".into(), vec![1.0, 1.0, 1.0, 1.0]), ("hate".into(), vec![-1.0; 4])],
        )
        .unwrap();
        Vectorizer::EmbeddingAverage(table)
    }

    #[test]
    fn sequence_pipeline_feeds_padded_indices() {
        let clf = Arc::new(Recording::new(0.91, Some(100)));
        let pipeline =
            SentimentPipeline::new(sequence_vectorizer(), Box::new(clf.clone()), LabelPolicy::Wide65_35)
                .unwrap();

        let prediction = pipeline.predict("I LOVE this!!!").unwrap();
        assert_eq!(prediction.label, Sentiment::Positive);
        assert_eq!(prediction.words, 3);
        assert_eq!(prediction.known_words, 3);

        let seen = clf.seen.lock().unwrap().clone().unwrap();
        let Features::Sequence(ids) = seen else {
            panic!("expected sequence features");
        };
        assert_eq!(ids.len(), 100);
        assert_eq!(&ids[97..], &[1, 2, 3]);
        assert!(ids[..97].iter().all(|&id| id == 0));
    }

    #[test]
    fn embedding_pipeline_zero_vector_for_symbols() {
        let clf = Arc::new(Recording::new(0.5, Some(4)));
        let pipeline =
            SentimentPipeline::new(embedding_vectorizer(), Box::new(clf.clone()), LabelPolicy::Wide60_40)
                .unwrap();

        let prediction = pipeline.predict("?!? 123").unwrap();
        assert_eq!(prediction.label, Sentiment::Neutral);
        assert_eq!(prediction.words, 0);
        assert_eq!(*clf.seen.lock().unwrap(), Some(Features::Dense(vec![0.0; 4])));
    }

    #[test]
    fn empty_text_still_predicts() {
        let pipeline = SentimentPipeline::new(
            sequence_vectorizer(),
            Box::new(Recording::new(0.2, None)),
            LabelPolicy::Binary50,
        )
        .unwrap();
        let prediction = pipeline.predict("").unwrap();
        assert_eq!(prediction.label, Sentiment::Negative);
        assert_eq!(prediction.known_words, 0);
    }

    #[test]
    fn width_mismatch_is_fatal() {
        let err = SentimentPipeline::new(
            embedding_vectorizer(),
            Box::new(Recording::new(0.5, Some(300))),
            LabelPolicy::default(),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("dimension mismatch"), "{err}");
    }

    #[test]
    fn output_clamped_to_unit_interval() {
        let pipeline = SentimentPipeline::new(
            sequence_vectorizer(),
            Box::new(Recording::new(1.2, None)),
            LabelPolicy::default(),
        )
        .unwrap();
        assert_eq!(pipeline.predict("love").unwrap().probability, 1.0);
    }

    #[test]
    fn non_finite_output_is_an_error() {
        let pipeline = SentimentPipeline::new(
            sequence_vectorizer(),
            Box::new(Recording::new(f32::NAN, None)),
            LabelPolicy::default(),
        )
        .unwrap();
        assert!(pipeline.predict("love").is_err());
    }

    #[test]
    fn load_vectorizer_checks_embedding_dim() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "good 0.1 0.2\nbad -0.1 -0.2\n").unwrap();

        let mut config = PipelineConfig {
            strategy: Strategy::EmbeddingAverage,
            word_vectors_path: path,
            ..Default::default()
        };
        let err = load_vectorizer(&config).err().unwrap();
        assert!(err.to_string().contains("dimension mismatch"), "{err}");

        config.embedding_dim = 2;
        let vectorizer = load_vectorizer(&config).unwrap();
        assert_eq!(vectorizer.width(), 2);
    }

    #[test]
    fn load_vectorizer_missing_tokenizer() {
        let config = PipelineConfig {
            tokenizer_path: "no/such/tokenizer.json".into(),
            ..Default::default()
        };
        assert!(load_vectorizer(&config).is_err());
    }
}
