use std::fmt;

use image::Rgb;

/// A display color and class name for one class index.
///
/// Labels are positional: the label at index `k` of a result's table
/// describes class id `k`. Index 0 is background by convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColoredLabel {
    pub color: Rgb<u8>,
    pub label: String,
}

impl ColoredLabel {
    pub fn new(color: impl Into<Rgb<u8>>, label: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            label: label.into(),
        }
    }
}

/// Which of the two mask flavours a provider emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum OutputType {
    /// One class id per pixel.
    #[default]
    CategoryMask,
    /// One score per class per pixel.
    ConfidenceMask,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CategoryMask => f.write_str("category mask"),
            Self::ConfidenceMask => f.write_str("confidence mask"),
        }
    }
}

/// Per-pixel payload of a segmentation result. All buffers are row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputPayload {
    /// `width * height` class ids.
    CategoryMask(Vec<u32>),
    /// `num_classes` planes of `width * height` scores each.
    ConfidenceMask(Vec<Vec<f32>>),
}

impl OutputPayload {
    pub const fn output_type(&self) -> OutputType {
        match self {
            Self::CategoryMask(_) => OutputType::CategoryMask,
            Self::ConfidenceMask(_) => OutputType::ConfidenceMask,
        }
    }
}

/// Output of one inference call. Read-only once built; validation of the
/// payload against the dimensions and label table happens in the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    width: u32,
    height: u32,
    colored_labels: Vec<ColoredLabel>,
    masks: OutputPayload,
}

impl SegmentationResult {
    pub const fn new(
        width: u32,
        height: u32,
        colored_labels: Vec<ColoredLabel>,
        masks: OutputPayload,
    ) -> Self {
        Self {
            width,
            height,
            colored_labels,
            masks,
        }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    pub fn colored_labels(&self) -> &[ColoredLabel] {
        &self.colored_labels
    }

    pub const fn masks(&self) -> &OutputPayload {
        &self.masks
    }

    pub const fn output_type(&self) -> OutputType {
        self.masks.output_type()
    }

    /// Number of pixels the payload must cover.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn into_parts(self) -> (u32, u32, Vec<ColoredLabel>, OutputPayload) {
        (self.width, self.height, self.colored_labels, self.masks)
    }
}
