//! Inference layer: tokenizer and word-vector vectorizers, ONNX Runtime classifier,
//! and the text → label pipeline that ties them together.

pub mod classifier;
pub mod pipeline;
pub mod tokenizer;
pub mod vectorizer;
pub mod word_vectors;

pub use classifier::Classifier;
#[cfg(feature = "onnx")]
pub use classifier::OnnxClassifier;
#[cfg(feature = "onnx")]
pub use pipeline::load_pipeline;
pub use pipeline::{Prediction, SentimentPipeline, load_vectorizer};
pub use tokenizer::WordTokenizer;
pub use vectorizer::{Features, SequenceVectorizer, Vectorizer, pad_sequence};
pub use word_vectors::{VectorFormat, WordVectors};
