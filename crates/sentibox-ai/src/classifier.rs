//! Scalar-output sentiment classifiers.
//!
//! [`Classifier`] is the seam between the pipeline and the model runtime.
//! With the `onnx` feature, [`OnnxClassifier`] runs an ONNX model exported
//! from the training notebook: one `[1, width]` input, first output holding
//! the probability.

use std::sync::Arc;

use crate::vectorizer::Features;

/// A pretrained binary classifier producing one probability per input.
pub trait Classifier: Send + Sync {
    /// Input width declared by the model, when it is statically known.
    fn input_width(&self) -> Option<usize> {
        None
    }

    /// Run one forward pass and return the raw scalar output.
    fn predict(&self, features: &Features) -> anyhow::Result<f32>;
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn input_width(&self) -> Option<usize> {
        (**self).input_width()
    }

    fn predict(&self, features: &Features) -> anyhow::Result<f32> {
        (**self).predict(features)
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::Session;
    use ort::tensor::{PrimitiveTensorElementType, TensorElementType};
    use ort::value::{Tensor, ValueType};
    use tracing::info;

    use super::Classifier;
    use crate::vectorizer::Features;

    /// Element type the model expects on its input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum InputKind {
        Float,
        Int64,
        Int32,
    }

    /// ONNX Runtime classifier.
    ///
    /// The session needs exclusive access while running, so it sits behind a
    /// mutex; one request holds it for one forward pass.
    pub struct OnnxClassifier {
        session: Mutex<Session>,
        input_name: String,
        input_kind: InputKind,
        width: Option<usize>,
    }

    impl OnnxClassifier {
        /// Load a model from an `.onnx` file.
        pub fn load(model_path: &Path) -> anyhow::Result<Self> {
            anyhow::ensure!(
                model_path.exists(),
                "model not found at {}",
                model_path.display()
            );

            let session = Session::builder()?.commit_from_file(model_path)?;

            let input = session
                .inputs()
                .first()
                .ok_or_else(|| anyhow::anyhow!("model declares no inputs"))?;
            let input_name = input.name().to_string();
            let (input_kind, width) = describe_input(input.dtype());
            anyhow::ensure!(
                !session.outputs().is_empty(),
                "model declares no outputs"
            );

            info!(
                input = %input_name,
                kind = ?input_kind,
                width = ?width,
                model = %model_path.display(),
                "loaded classifier"
            );
            Ok(Self {
                session: Mutex::new(session),
                input_name,
                input_kind,
                width,
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn input_width(&self) -> Option<usize> {
            self.width
        }

        fn predict(&self, features: &Features) -> anyhow::Result<f32> {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("classifier session poisoned"))?;

            match (self.input_kind, features) {
                (InputKind::Int64, Features::Sequence(ids)) => {
                    run_scalar(&mut session, &self.input_name, ids.clone())
                }
                (InputKind::Int32, Features::Sequence(ids)) => {
                    let ids = ids
                        .iter()
                        .map(|&id| i32::try_from(id))
                        .collect::<Result<Vec<_>, _>>()?;
                    run_scalar(&mut session, &self.input_name, ids)
                }
                (InputKind::Float, features) => {
                    run_scalar(&mut session, &self.input_name, features.to_f32())
                }
                (kind, Features::Dense(_)) => {
                    anyhow::bail!("model expects {kind:?} input but received dense features")
                }
            }
        }
    }

    /// Feed one `[1, n]` tensor and return the first value of the first output.
    fn run_scalar<T>(session: &mut Session, input_name: &str, data: Vec<T>) -> anyhow::Result<f32>
    where
        T: PrimitiveTensorElementType + std::fmt::Debug + Clone + 'static,
    {
        let shape = [1i64, data.len() as i64];
        let tensor = Tensor::from_array((shape, data.into_boxed_slice()))?;
        let outputs = session.run(ort::inputs![input_name => tensor])?;
        let (_, values) = outputs[0].try_extract_tensor::<f32>()?;
        values
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("model returned an empty output"))
    }

    /// Element kind and static last dimension of the model input.
    fn describe_input(input_type: &ValueType) -> (InputKind, Option<usize>) {
        match input_type {
            ValueType::Tensor { ty, shape, .. } => {
                let kind = match ty {
                    TensorElementType::Int64 => InputKind::Int64,
                    TensorElementType::Int32 => InputKind::Int32,
                    _ => InputKind::Float,
                };
                let width = shape
                    .last()
                    .and_then(|&d| if d > 0 { Some(d as usize) } else { None });
                (kind, width)
            }
            _ => (InputKind::Float, None),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f32);

    impl Classifier for Fixed {
        fn predict(&self, _features: &Features) -> anyhow::Result<f32> {
            Ok(self.0)
        }
    }

    #[test]
    fn default_input_width_is_unknown() {
        let clf = Fixed(0.7);
        assert_eq!(clf.input_width(), None);
        assert_eq!(clf.predict(&Features::Dense(vec![0.0; 4])).unwrap(), 0.7);
    }
}
