use anyhow::{ensure, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing::info;

use image_segmenter_rs::{
    tracing_config::init_tracing, Config, ImageProcessor, ImageSegmenter, OnnxSegmentationModel,
};

fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.verbose)?;

    ensure!(config.model_path.exists(), "Model path does not exist");
    ensure!(config.input_dir.exists(), "Input directory does not exist");

    ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()?;

    let options = config.segmenter_options()?;
    let segmenter = ImageSegmenter::<OnnxSegmentationModel>::create_from_options(options)
        .with_context(|| format!("Failed to load model: {}", config.model_path.display()))?;

    let reports = ImageProcessor::new(segmenter, config).process_directory()?;

    let compared: Vec<f64> = reports.iter().filter_map(|r| r.mismatch_ratio).collect();
    if !compared.is_empty() {
        let mean = compared.iter().sum::<f64>() / compared.len() as f64;
        info!(images = compared.len(), mean_mismatch_ratio = mean, "ground truth comparison");
    }
    info!(images = reports.len(), "done");

    Ok(())
}
