//! Core types shared across sentibox: text normalisation, label policies,
//! pipeline configuration, and the JSON wire format.

pub mod config;
pub mod policy;
pub mod text;
pub mod wire;

pub use config::{ConfigError, PadSide, PipelineConfig, Strategy};
pub use policy::{LabelPolicy, Sentiment};
pub use text::{normalize, words};
pub use wire::{ERROR_LABEL, HealthResponse, PredictRequest, PredictResponse};
