use crate::error::{InferenceError, ModelLoadError};
use ndarray::Array2;
use std::path::Path;
use tokenizers::{
    PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection, TruncationParams,
    TruncationStrategy,
};

/// Token tensors for a single input, each shaped `[1, seq_len]`.
#[derive(Debug, Clone)]
pub struct EncodedText {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
}

impl EncodedText {
    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Wraps a HuggingFace tokenizer configured for classification inputs:
/// truncated to `max_length` keeping the earliest tokens, padded with the
/// tokenizer's own pad token.
pub struct TextEncoder {
    tokenizer: Tokenizer,
}

impl TextEncoder {
    pub fn from_file(path: impl AsRef<Path>, max_length: usize) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ModelLoadError::TokenizerNotFound(path.to_path_buf()));
        }
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;
        Self::new(tokenizer, max_length)
    }

    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self, ModelLoadError> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::LongestFirst,
                direction: TruncationDirection::Right,
                ..Default::default()
            }))
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;

        // Keep whatever pad token the tokenizer file ships with.
        let padding = tokenizer.get_padding().cloned().unwrap_or_default();
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..padding
        }));

        Ok(Self { tokenizer })
    }

    pub fn encode(&self, text: &str) -> Result<EncodedText, InferenceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenization(e.to_string()))?;

        let seq_len = encoding.get_ids().len();
        if seq_len == 0 {
            return Err(InferenceError::Tokenization(
                "text produced no tokens".to_string(),
            ));
        }

        let widen = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<_>>();

        Ok(EncodedText {
            input_ids: Array2::from_shape_vec((1, seq_len), widen(encoding.get_ids()))?,
            attention_mask: Array2::from_shape_vec(
                (1, seq_len),
                widen(encoding.get_attention_mask()),
            )?,
            token_type_ids: Array2::from_shape_vec((1, seq_len), widen(encoding.get_type_ids()))?,
        })
    }
}
