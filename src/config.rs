use std::path::PathBuf;
use std::thread;

use clap::{ArgAction, Parser};
use image::ImageFormat;

use crate::errors::Result;
use crate::options::SegmenterOptions;
use crate::result::OutputType;

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    pub input_dir: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(short, long)]
    pub model_path: PathBuf,

    /// Class names, one per line, background first
    #[arg(short, long)]
    pub label_file: Option<PathBuf>,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    #[arg(short = 't', long, value_enum, default_value_t = OutputType::CategoryMask)]
    pub output_type: OutputType,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Directory of expected colored masks mirroring the input layout
    #[arg(short, long)]
    pub ground_truth_dir: Option<PathBuf>,

    #[arg(short = 'j', long, default_value_t = default_num_threads())]
    pub num_threads: usize,

    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn segmenter_options(&self) -> Result<SegmenterOptions> {
        let options = SegmenterOptions::from_file(&self.model_path)?
            .with_output_type(self.output_type)
            .with_device_id(self.device_id);
        match &self.label_file {
            Some(path) => options.with_label_file(path),
            None => Ok(options),
        }
    }
}

fn default_num_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn check_format(s: &str) -> std::result::Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
