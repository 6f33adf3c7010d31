use image::{DynamicImage, GenericImageView};

use crate::colormap::colored_labels;
use crate::errors::Result;
use crate::options::SegmenterOptions;
use crate::result::{ColoredLabel, OutputPayload, OutputType, SegmentationResult};
use crate::traits::InferenceProvider;

/// Deterministic provider for tests.
///
/// Scores are derived from each pixel's red channel: class `k` scores
/// `-(red - center_k)^2`, with centers spread evenly over `0..=255`. Both
/// output types come from the same scores, so a category result always
/// equals the argmax of the matching confidence result.
#[derive(Debug, Clone)]
pub struct MockInferenceProvider {
    pub output_type: OutputType,
    pub colored_labels: Vec<ColoredLabel>,
}

impl MockInferenceProvider {
    pub fn new(output_type: OutputType, labels: &[&str]) -> Self {
        Self {
            output_type,
            colored_labels: colored_labels(labels),
        }
    }

    fn scores(&self, red: u8) -> impl Iterator<Item = f32> + '_ {
        let classes = self.colored_labels.len().max(1);
        let step = 255.0 / classes as f32;
        (0..self.colored_labels.len()).map(move |k| {
            let center = step * (k as f32 + 0.5);
            let distance = f32::from(red) - center;
            -(distance * distance)
        })
    }
}

/// Factory used by tests: background/person/horse in category mode.
pub fn create_mock_provider() -> MockInferenceProvider {
    MockInferenceProvider::new(OutputType::CategoryMask, &["background", "person", "horse"])
}

impl InferenceProvider for MockInferenceProvider {
    fn from_options(options: &SegmenterOptions) -> Result<Self> {
        let labels: Vec<&str> = match options.labels() {
            Some(labels) => labels.iter().map(String::as_str).collect(),
            None => vec!["background", "person", "horse"],
        };
        Ok(Self::new(options.output_type(), &labels))
    }

    fn output_type(&self) -> OutputType {
        self.output_type
    }

    fn segment(&self, image: &DynamicImage) -> Result<SegmentationResult> {
        let (width, height) = image.dimensions();
        let rgb = image.to_rgb8();
        let num_classes = self.colored_labels.len();

        let masks = match self.output_type {
            OutputType::CategoryMask => OutputPayload::CategoryMask(
                rgb.pixels()
                    .map(|pixel| {
                        let mut best = 0u32;
                        let mut best_score = f32::NEG_INFINITY;
                        for (k, score) in (0u32..).zip(self.scores(pixel.0[0])) {
                            if score > best_score {
                                best = k;
                                best_score = score;
                            }
                        }
                        best
                    })
                    .collect(),
            ),
            OutputType::ConfidenceMask => {
                let mut planes = vec![Vec::with_capacity(rgb.len() / 3); num_classes];
                for pixel in rgb.pixels() {
                    for (plane, score) in planes.iter_mut().zip(self.scores(pixel.0[0])) {
                        plane.push(score);
                    }
                }
                OutputPayload::ConfidenceMask(planes)
            }
        };

        Ok(SegmentationResult::new(
            width,
            height,
            self.colored_labels.clone(),
            masks,
        ))
    }
}
