pub mod colormap;
pub mod config;
pub mod errors;
pub mod model;
pub mod options;
pub mod renderer;
pub mod result;
pub mod segmenter;
pub mod traits;
pub mod tracing_config;

pub mod mocks;

use image::ImageFormat;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub use colormap::{pascal_voc_color, PASCAL_VOC_LABELS};
pub use config::Config;
pub use errors::{Result, SegmenterError};
pub use model::OnnxSegmentationModel;
pub use options::{ModelSource, SegmenterOptions};
pub use renderer::{derive_category_from_confidence, render, visualize, RankedLabels};
pub use result::{ColoredLabel, OutputPayload, OutputType, SegmentationResult};
pub use segmenter::ImageSegmenter;
pub use traits::*;

/// Outcome for one processed file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub labels: RankedLabels,
    /// Fraction of channel values differing from the ground truth, if one was found.
    pub mismatch_ratio: Option<f64>,
}

/// Segments every image under a directory and writes colored masks.
pub struct ImageProcessor<P: InferenceProvider> {
    segmenter: ImageSegmenter<P>,
    config: Config,
}

impl<P: InferenceProvider> ImageProcessor<P> {
    pub const fn new(segmenter: ImageSegmenter<P>, config: Config) -> Self {
        Self { segmenter, config }
    }

    pub fn process_directory(&self) -> Result<Vec<ImageReport>> {
        let input_path = &self.config.input_dir;
        let output_path = &self.config.output_dir;

        if !input_path.exists() {
            return Err(SegmenterError::FileSystem {
                path: input_path.clone(),
                operation: "check input directory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        fs::create_dir_all(output_path).map_err(|e| SegmenterError::FileSystem {
            path: output_path.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        let image_files = self.collect_image_files(input_path);

        if image_files.is_empty() {
            warn!(input = %input_path.display(), "no images to process");
            return Ok(Vec::new());
        }

        let pb = ProgressBar::new(image_files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .map_err(|e| SegmenterError::Configuration {
                    message: e.to_string(),
                })?
                .progress_chars("#>-"),
        );

        let reports: Vec<ImageReport> = image_files
            .par_iter()
            .progress_with(pb.clone())
            .map(|input_file| self.process_single_image(input_file, output_path))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        pb.finish_and_clear();
        info!(count = reports.len(), "all images processed");
        Ok(reports)
    }

    fn collect_image_files(&self, input_path: &Path) -> Vec<PathBuf> {
        WalkDir::new(input_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported_image_format(e.path()))
            .map(|e| e.into_path())
            .collect()
    }

    /// Only extensions whose decoder is compiled in are picked up.
    pub fn is_supported_image_format(&self, path: &Path) -> bool {
        ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
    }

    /// Returns `None` when the file cannot be decoded; the run continues.
    fn process_single_image(
        &self,
        input_file: &Path,
        output_dir: &Path,
    ) -> Result<Option<ImageReport>> {
        let img = match image::open(input_file) {
            Ok(img) => img,
            Err(e) => {
                warn!(input = %input_file.display(), error = %e, "skipping undecodable image");
                return Ok(None);
            }
        };

        let result = self.segmenter.segment(&img)?;
        let (mask_image, labels) = visualize(&result)?;

        let relative_path = self.get_relative_path(input_file)?;
        let output_file = output_dir
            .join(&relative_path)
            .with_extension(&self.config.format);

        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent).map_err(|e| SegmenterError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create output directory".to_string(),
                source: e,
            })?;
        }

        let output_format =
            ImageFormat::from_extension(&self.config.format).unwrap_or(ImageFormat::Png);
        mask_image
            .save_with_format(&output_file, output_format)
            .map_err(|e| SegmenterError::ImageProcessing {
                path: output_file.display().to_string(),
                operation: "save mask".to_string(),
                source: Box::new(e),
            })?;

        let mismatch_ratio = match &self.config.ground_truth_dir {
            Some(dir) => self.compare_with_ground_truth(&mask_image, &dir.join(&relative_path))?,
            None => None,
        };

        info!(
            input = %input_file.display(),
            labels = ?labels,
            mismatch_ratio = ?mismatch_ratio,
            "segmented"
        );

        Ok(Some(ImageReport {
            input: input_file.to_path_buf(),
            output: output_file,
            labels,
            mismatch_ratio,
        }))
    }

    /// Ground truth is looked up as a PNG at the input's relative path.
    fn compare_with_ground_truth(
        &self,
        mask_image: &image::RgbImage,
        relative_ground_truth: &Path,
    ) -> Result<Option<f64>> {
        let path = relative_ground_truth.with_extension("png");
        if !path.is_file() {
            warn!(path = %path.display(), "ground truth not found");
            return Ok(None);
        }

        let expected = image::open(&path)
            .map_err(|e| SegmenterError::ImageProcessing {
                path: path.display().to_string(),
                operation: "open ground truth".to_string(),
                source: Box::new(e),
            })?
            .into_rgb8();

        renderer::mismatch_ratio(mask_image, &expected).map(Some)
    }

    pub fn get_relative_path(&self, input_file: &Path) -> Result<PathBuf> {
        let input_dir = &self.config.input_dir;
        input_file
            .strip_prefix(input_dir)
            .map(|p| p.to_path_buf())
            .map_err(|_| SegmenterError::FileSystem {
                path: input_file.to_path_buf(),
                operation: "compute relative path".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "input file is not inside the input directory",
                ),
            })
    }
}
