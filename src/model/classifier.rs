use crate::error::{InferenceError, ModelLoadError};
use crate::model::loader;
use crate::preprocessing::text::EncodedText;
use ndarray::Axis;
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

/// Anything that turns token tensors into one row of class logits.
pub trait SequenceClassifier: Send + Sync {
    fn logits(&self, encoded: &EncodedText) -> Result<Vec<f32>, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    InputIds,
    AttentionMask,
    TokenTypeIds,
}

impl InputKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "input_ids" => Some(InputKind::InputIds),
            "attention_mask" => Some(InputKind::AttentionMask),
            "token_type_ids" => Some(InputKind::TokenTypeIds),
            _ => None,
        }
    }
}

/// Sequence classifier exported to ONNX (BERT-family graph).
///
/// `Session::run` needs `&mut self`, so the session sits behind a mutex and
/// concurrent requests take turns.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    inputs: Vec<(String, InputKind)>,
}

impl OnnxClassifier {
    pub fn load(model_file: &Path, intra_threads: usize) -> Result<Self, ModelLoadError> {
        let session = loader::load_session(model_file, intra_threads)?;

        let inputs = session
            .inputs
            .iter()
            .map(|input| {
                InputKind::from_name(&input.name)
                    .map(|kind| (input.name.clone(), kind))
                    .ok_or_else(|| ModelLoadError::UnsupportedInput(input.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            session: Mutex::new(session),
            inputs,
        })
    }
}

impl SequenceClassifier for OnnxClassifier {
    fn logits(&self, encoded: &EncodedText) -> Result<Vec<f32>, InferenceError> {
        let mut feeds: Vec<(String, SessionInputValue<'_>)> = Vec::with_capacity(self.inputs.len());
        for (name, kind) in &self.inputs {
            let array = match kind {
                InputKind::InputIds => &encoded.input_ids,
                InputKind::AttentionMask => &encoded.attention_mask,
                InputKind::TokenTypeIds => &encoded.token_type_ids,
            };
            feeds.push((name.clone(), TensorRef::from_array_view(array)?.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::SessionPoisoned)?;
        let outputs = session.run(feeds)?;

        // Output shape: [batch, num_classes]
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        let output = ndarray::ArrayViewD::from_shape(dims.as_slice(), data)?;
        let logits: Vec<f32> = output.index_axis(Axis(0), 0).iter().copied().collect();

        Ok(logits)
    }
}
