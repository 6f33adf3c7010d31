use std::path::Path;

use image::DynamicImage;

use crate::errors::Result;
use crate::model::OnnxSegmentationModel;
use crate::options::SegmenterOptions;
use crate::result::SegmentationResult;
use crate::traits::InferenceProvider;

/// Performs segmentation on images through an [`InferenceProvider`].
///
/// The provider, and whatever runtime resources it holds, lives exactly as
/// long as the segmenter.
pub struct ImageSegmenter<P: InferenceProvider = OnnxSegmentationModel> {
    options: SegmenterOptions,
    provider: P,
}

impl<P: InferenceProvider> ImageSegmenter<P> {
    pub const fn new(options: SegmenterOptions, provider: P) -> Self {
        Self { options, provider }
    }

    /// Build the provider from `options`.
    pub fn create_from_options(options: SegmenterOptions) -> Result<Self> {
        let provider = P::from_options(&options)?;
        Ok(Self::new(options, provider))
    }

    /// Category-mask segmenter with default labels for the model at `path`.
    pub fn create_from_file(path: &Path) -> Result<Self> {
        Self::create_from_options(SegmenterOptions::from_file(path)?)
    }

    pub const fn options(&self) -> &SegmenterOptions {
        &self.options
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Segment one image. Provider errors are returned unchanged.
    pub fn segment(&self, image: &DynamicImage) -> Result<SegmentationResult> {
        self.provider.segment(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SegmenterError;
    use crate::mocks::MockInferenceProvider;
    use crate::options::ModelSource;
    use crate::result::{OutputPayload, OutputType};
    use image::{Rgb, RgbImage};

    #[test]
    fn test_create_from_options_uses_output_type_and_labels() -> Result<()> {
        let options =
            SegmenterOptions::new(ModelSource::Content(vec![0]), OutputType::ConfidenceMask)?
                .with_labels(vec!["sky".to_string(), "ground".to_string()])?;
        let segmenter = ImageSegmenter::<MockInferenceProvider>::create_from_options(options)?;

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([200, 0, 0])));
        let result = segmenter.segment(&image)?;

        assert_eq!(result.output_type(), OutputType::ConfidenceMask);
        assert_eq!(result.colored_labels()[1].label, "ground");
        match result.masks() {
            OutputPayload::ConfidenceMask(planes) => assert_eq!(planes.len(), 2),
            OutputPayload::CategoryMask(_) => panic!("expected confidence masks"),
        }
        Ok(())
    }

    #[test]
    fn test_create_from_missing_file_fails() {
        let result =
            ImageSegmenter::<MockInferenceProvider>::create_from_file(Path::new("missing.onnx"));
        assert!(matches!(result, Err(SegmenterError::Validation { .. })));
    }
}
