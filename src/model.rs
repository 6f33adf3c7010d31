use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::session::{builder::SessionBuilder, Session};
use ort::value::TensorRef;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::colormap::{colored_labels, default_labels};
use crate::errors::{Result, SegmenterError};
use crate::options::{ModelSource, SegmenterOptions};
use crate::result::{ColoredLabel, OutputPayload, OutputType, SegmentationResult};
use crate::traits::InferenceProvider;

/// Input side used when the model declares a dynamic spatial shape.
pub const DEFAULT_INPUT_SIZE: u32 = 513;

const NORMALIZATION_MEAN: f32 = 127.5;
const NORMALIZATION_STD: f32 = 127.5;

/// Semantic segmentation model served by ONNX Runtime.
///
/// Expects one NCHW RGB input and a `[1, classes, height, width]` score
/// output. The session is released when the model is dropped.
pub struct OnnxSegmentationModel {
    session: Mutex<Session>,
    input_width: u32,
    input_height: u32,
    output_type: OutputType,
    labels: Option<Vec<String>>,
}

impl OnnxSegmentationModel {
    pub fn new(options: &SegmenterOptions) -> Result<Self> {
        let builder = session_builder(options.device_id())?;
        let session = match options.model_source() {
            ModelSource::File(path) => {
                builder
                    .commit_from_file(path)
                    .map_err(|e| SegmenterError::ModelLoad {
                        operation: format!("load model file: {}", path.display()),
                        source: Box::new(e),
                    })?
            }
            ModelSource::Content(bytes) => {
                builder
                    .commit_from_memory(bytes)
                    .map_err(|e| SegmenterError::ModelLoad {
                        operation: "load model from memory".to_string(),
                        source: Box::new(e),
                    })?
            }
        };

        let (input_width, input_height) = input_size(&session)?;
        info!(input_width, input_height, output_type = %options.output_type(), "model loaded");

        Ok(Self {
            session: Mutex::new(session),
            input_width,
            input_height,
            output_type: options.output_type(),
            labels: options.labels().map(<[String]>::to_vec),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs =
            binding.run(ort::inputs![TensorRef::from_array_view(&tensor.as_standard_layout())?])?;
        let scores = outputs[0]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned();
        Ok(scores)
    }

    fn colored_labels(&self, num_classes: usize) -> Result<Vec<ColoredLabel>> {
        match &self.labels {
            Some(labels) if labels.len() != num_classes => {
                Err(SegmenterError::InconsistentClassCount {
                    labels: labels.len(),
                    masks: num_classes,
                })
            }
            Some(labels) => Ok(colored_labels(labels)),
            None => Ok(colored_labels(&default_labels(num_classes))),
        }
    }
}

impl InferenceProvider for OnnxSegmentationModel {
    fn from_options(options: &SegmenterOptions) -> Result<Self> {
        Self::new(options)
    }

    fn output_type(&self) -> OutputType {
        self.output_type
    }

    fn segment(&self, img: &DynamicImage) -> Result<SegmentationResult> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(SegmenterError::Validation {
                field: "image".to_string(),
                reason: "has no pixels".to_string(),
            });
        }

        let tensor = preprocess(&img.to_rgb8(), self.input_width, self.input_height);
        let scores = self.predict(tensor.view())?;
        let scores = scores.index_axis(Axis(0), 0);
        let num_classes = scores.len_of(Axis(0));
        debug!(num_classes, shape = ?scores.shape(), "inference finished");

        let colored_labels = self.colored_labels(num_classes)?;
        let masks = postprocess(scores, self.output_type, width, height);
        Ok(SegmentationResult::new(width, height, colored_labels, masks))
    }
}

#[cfg_attr(not(any(feature = "cuda", feature = "tensorrt")), allow(unused_variables))]
fn session_builder(device_id: i32) -> Result<SessionBuilder> {
    let builder = SessionBuilder::new().map_err(|e| SegmenterError::ModelLoad {
        operation: "initialize session builder".to_string(),
        source: Box::new(e),
    })?;

    #[cfg(any(feature = "cuda", feature = "tensorrt"))]
    let builder = builder
        .with_execution_providers([
            #[cfg(feature = "tensorrt")]
            ort::execution_providers::TensorRTExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
            #[cfg(feature = "cuda")]
            ort::execution_providers::CUDAExecutionProvider::default()
                .with_device_id(device_id)
                .build(),
        ])
        .map_err(|e| SegmenterError::ModelLoad {
            operation: "register execution providers".to_string(),
            source: Box::new(e),
        })?;

    builder
        .with_memory_pattern(true)
        .map_err(|e| SegmenterError::ModelLoad {
            operation: "enable memory pattern".to_string(),
            source: Box::new(e),
        })
}

/// Spatial size of the first input, `(width, height)`, from an NCHW shape.
fn input_size(session: &Session) -> Result<(u32, u32)> {
    let shape = session
        .inputs
        .first()
        .and_then(|input| input.input_type.tensor_shape())
        .ok_or_else(|| SegmenterError::ModelLoad {
            operation: "read model input shape".to_string(),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "model has no tensor input",
            )),
        })?;

    let dimension = |axis: usize| match shape.get(axis) {
        Some(&d) if d > 0 => d as u32,
        _ => DEFAULT_INPUT_SIZE,
    };
    Ok((dimension(3), dimension(2)))
}

/// Resize to the model input and normalize into a `[1, 3, h, w]` tensor.
pub fn preprocess(image: &RgbImage, input_width: u32, input_height: u32) -> Array4<f32> {
    let resized = imageops::resize(image, input_width, input_height, FilterType::Triangle);
    resized
        .as_ndarray3()
        .mapv(|v| (f32::from(v) - NORMALIZATION_MEAN) / NORMALIZATION_STD)
        .insert_axis(Axis(0))
}

/// Map `[classes, h, w]` model scores onto a `width x height` image.
///
/// Both output types sample the same source cell for a given pixel, so the
/// category mask is exactly the argmax of the confidence masks.
pub fn postprocess(
    scores: ArrayView3<f32>,
    output_type: OutputType,
    width: u32,
    height: u32,
) -> OutputPayload {
    let (num_classes, model_height, model_width) = scores.dim();
    let source_cells: Vec<(usize, usize)> = (0..height as usize)
        .flat_map(|y| {
            let sy = nearest(y, height as usize, model_height);
            (0..width as usize).map(move |x| (sy, nearest(x, width as usize, model_width)))
        })
        .collect();

    match output_type {
        OutputType::CategoryMask => OutputPayload::CategoryMask(
            source_cells
                .iter()
                .map(|&(sy, sx)| argmax(scores.slice(s![.., sy, sx])))
                .collect(),
        ),
        OutputType::ConfidenceMask => OutputPayload::ConfidenceMask(
            (0..num_classes)
                .map(|k| {
                    source_cells
                        .iter()
                        .map(|&(sy, sx)| scores[[k, sy, sx]])
                        .collect()
                })
                .collect(),
        ),
    }
}

fn nearest(position: usize, size: usize, source_size: usize) -> usize {
    ((position * source_size) / size).min(source_size.saturating_sub(1))
}

fn argmax(scores: ArrayView1<f32>) -> u32 {
    let mut best = 0u32;
    let mut best_score = f32::NAN;
    for (k, &score) in (0u32..).zip(scores.iter()) {
        if score > best_score || (best_score.is_nan() && !score.is_nan()) {
            best = k;
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::derive_category_from_confidence;
    use image::Rgb;

    #[test]
    fn test_preprocess_shape_and_range() {
        let image = RgbImage::from_pixel(40, 20, Rgb([255, 0, 128]));
        let tensor = preprocess(&image, 16, 8);
        assert_eq!(tensor.shape(), &[1, 3, 8, 16]);
        assert!((tensor[[0, 0, 4, 4]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 4, 4]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_sampling() {
        assert_eq!(nearest(0, 4, 2), 0);
        assert_eq!(nearest(1, 4, 2), 0);
        assert_eq!(nearest(2, 4, 2), 1);
        assert_eq!(nearest(3, 4, 2), 1);
        assert_eq!(nearest(2, 3, 6), 4);
    }

    #[test]
    fn test_postprocess_modes_agree() -> Result<()> {
        let scores = Array3::from_shape_fn((3, 4, 5), |(k, y, x)| {
            ((k * 7 + y * 3 + x * 5) % 11) as f32
        });

        let category = postprocess(scores.view(), OutputType::CategoryMask, 9, 7);
        let confidence = postprocess(scores.view(), OutputType::ConfidenceMask, 9, 7);

        let labels = colored_labels(&default_labels(3));
        let derived = derive_category_from_confidence(&SegmentationResult::new(
            9,
            7,
            labels,
            confidence,
        ))?;
        assert_eq!(category, OutputPayload::CategoryMask(derived));
        Ok(())
    }

    #[test]
    fn test_argmax_prefers_lowest_index() {
        let scores = array![0.5f32, 0.5, 0.2];
        assert_eq!(argmax(scores.view()), 0);
        let scores = array![f32::NAN, 0.1, 0.3];
        assert_eq!(argmax(scores.view()), 2);
    }
}
