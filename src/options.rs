use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, SegmenterError};
use crate::result::OutputType;

/// Where the model bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    File(PathBuf),
    Content(Vec<u8>),
}

impl ModelSource {
    fn validate(&self) -> Result<()> {
        match self {
            Self::File(path) if !path.is_file() => Err(SegmenterError::Validation {
                field: "model_source".to_string(),
                reason: format!("{} is not a readable model file", path.display()),
            }),
            Self::Content(bytes) if bytes.is_empty() => Err(SegmenterError::Validation {
                field: "model_source".to_string(),
                reason: "model content is empty".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Options for building an image segmenter.
///
/// Only constructible through [`SegmenterOptions::new`] so every instance
/// has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmenterOptions {
    model_source: ModelSource,
    output_type: OutputType,
    labels: Option<Vec<String>>,
    device_id: i32,
}

impl SegmenterOptions {
    pub fn new(model_source: ModelSource, output_type: OutputType) -> Result<Self> {
        model_source.validate()?;
        Ok(Self {
            model_source,
            output_type,
            labels: None,
            device_id: 0,
        })
    }

    /// Category-mask options for a model file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(ModelSource::File(path.into()), OutputType::CategoryMask)
    }

    /// Override the class names, index 0 first.
    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(SegmenterError::Validation {
                field: "labels".to_string(),
                reason: "must contain at least one label".to_string(),
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Read class names from a text file, one per line.
    pub fn with_label_file(self, path: &Path) -> Result<Self> {
        let labels = read_label_file(path)?;
        self.with_labels(labels)
    }

    pub const fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    /// GPU ordinal for the CUDA / TensorRT execution providers.
    pub const fn with_device_id(mut self, device_id: i32) -> Self {
        self.device_id = device_id;
        self
    }

    pub const fn model_source(&self) -> &ModelSource {
        &self.model_source
    }

    pub const fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub const fn device_id(&self) -> i32 {
        self.device_id
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }
}

/// Blank lines are skipped; surrounding whitespace is trimmed.
pub fn read_label_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| SegmenterError::FileSystem {
        path: path.to_path_buf(),
        operation: "read label file".to_string(),
        source: e,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
