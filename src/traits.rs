use image::DynamicImage;

use crate::errors::Result;
use crate::options::SegmenterOptions;
use crate::result::{OutputType, SegmentationResult};

/// Something that runs a segmentation model on decoded images.
///
/// Implementations own whatever native resources the model needs and release
/// them on drop. One call produces one result; the renderer never calls back.
pub trait InferenceProvider: Send + Sync {
    /// Build a provider from validated options.
    fn from_options(options: &SegmenterOptions) -> Result<Self>
    where
        Self: Sized;

    /// Which payload variant [`InferenceProvider::segment`] produces.
    fn output_type(&self) -> OutputType;

    /// Segment one image. Masks cover the image at its own resolution.
    fn segment(&self, image: &DynamicImage) -> Result<SegmentationResult>;
}
