use std::path::PathBuf;
use thiserror::Error;

use crate::result::OutputType;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the segmenter.
///
/// Mask validation failures carry the numbers that disagreed so callers can
/// tell a provider/label-table mismatch from a truncated buffer without
/// parsing messages. Collaborator failures (model loading, inference, I/O)
/// keep the operation that failed and the underlying error as `source`.
#[derive(Error, Debug)]
pub enum SegmenterError {
    #[error("Invalid mask size: expected {expected} values, got {actual}")]
    InvalidMaskSize { expected: usize, actual: usize },

    #[error("Label index {index} out of range ({num_labels} colored labels)")]
    LabelIndexOutOfRange { index: u32, num_labels: usize },

    #[error("Inconsistent class count: {labels} colored labels, {masks} masks")]
    InconsistentClassCount { labels: usize, masks: usize },

    #[error("Unexpected output type: expected {expected}, got {actual}")]
    UnexpectedOutputType {
        expected: OutputType,
        actual: OutputType,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxedSource,
    },

    #[error("Model load error: {operation} failed")]
    ModelLoad {
        operation: String,
        #[source]
        source: BoxedSource,
    },

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: BoxedSource,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SegmenterError>;

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build
/// `SegmenterError::FileSystem` directly; this is the fallback for `?`.
impl From<std::io::Error> for SegmenterError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for SegmenterError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// ONNX Runtime errors surfacing outside of session construction happen
/// while running the graph, so they are inference errors.
impl From<ort::Error> for SegmenterError {
    fn from(err: ort::Error) -> Self {
        Self::Inference {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors come from reinterpreting output tensors.
impl From<ndarray::ShapeError> for SegmenterError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Inference {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}
