//! Turns segmentation results into something a person can look at.
//!
//! Every function here is pure: inputs are borrowed, outputs freshly
//! allocated, and all precondition checks run before any output is built.

use std::cmp::Reverse;

use image::RgbImage;
use tracing::debug;

use crate::errors::{Result, SegmenterError};
use crate::result::{OutputPayload, OutputType, SegmentationResult};

/// Labels present in a category mask, most frequent first.
pub type RankedLabels = Vec<String>;

/// Pixel count of one class in a category mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelCount {
    pub index: u32,
    pub pixels: usize,
}

/// Color a category mask and rank the labels it contains.
///
/// Classes with equal pixel counts keep the order in which they first occur
/// in a row-major scan of the mask.
pub fn render(result: &SegmentationResult) -> Result<(RgbImage, RankedLabels)> {
    let mask = category_mask(result)?;
    let ranking = rank_labels(result)?;

    let colored_labels = result.colored_labels();
    let mut pixels = Vec::with_capacity(mask.len() * 3);
    for &index in mask {
        pixels.extend_from_slice(&colored_labels[index as usize].color.0);
    }

    let image = RgbImage::from_raw(result.width(), result.height(), pixels).ok_or(
        SegmenterError::InvalidMaskSize {
            expected: result.pixel_count(),
            actual: mask.len(),
        },
    )?;

    let labels: RankedLabels = ranking
        .iter()
        .map(|count| colored_labels[count.index as usize].label.clone())
        .collect();

    debug!(
        width = result.width(),
        height = result.height(),
        labels = ?labels,
        "rendered category mask"
    );

    Ok((image, labels))
}

/// Distinct classes of a category mask with their pixel counts, ranked by
/// descending count. Ties keep first-encountered order.
pub fn rank_labels(result: &SegmentationResult) -> Result<Vec<LabelCount>> {
    let mask = category_mask(result)?;
    let num_labels = result.colored_labels().len();

    let mut counts = vec![0usize; num_labels];
    let mut first_seen = Vec::new();
    for &index in mask {
        let slot = counts
            .get_mut(index as usize)
            .ok_or(SegmenterError::LabelIndexOutOfRange { index, num_labels })?;
        if *slot == 0 {
            first_seen.push(index);
        }
        *slot += 1;
    }

    let mut ranking: Vec<LabelCount> = first_seen
        .into_iter()
        .map(|index| LabelCount {
            index,
            pixels: counts[index as usize],
        })
        .collect();
    // stable: equal counts stay in first_seen order
    ranking.sort_by_key(|count| Reverse(count.pixels));

    Ok(ranking)
}

/// Per-pixel argmax over the confidence planes.
///
/// Ties go to the lowest class index. A NaN score never beats a number.
pub fn derive_category_from_confidence(result: &SegmentationResult) -> Result<Vec<u32>> {
    let planes = match result.masks() {
        OutputPayload::ConfidenceMask(planes) => planes,
        OutputPayload::CategoryMask(_) => {
            return Err(SegmenterError::UnexpectedOutputType {
                expected: OutputType::ConfidenceMask,
                actual: OutputType::CategoryMask,
            })
        }
    };

    let num_labels = result.colored_labels().len();
    if planes.len() != num_labels {
        return Err(SegmenterError::InconsistentClassCount {
            labels: num_labels,
            masks: planes.len(),
        });
    }

    let pixel_count = result.pixel_count();
    if let Some(plane) = planes.iter().find(|plane| plane.len() != pixel_count) {
        return Err(SegmenterError::InvalidMaskSize {
            expected: pixel_count,
            actual: plane.len(),
        });
    }

    let Some((first, rest)) = planes.split_first() else {
        if pixel_count == 0 {
            return Ok(Vec::new());
        }
        return Err(SegmenterError::Validation {
            field: "colored_labels".to_string(),
            reason: "no classes to choose from".to_string(),
        });
    };

    let mut best_scores = first.clone();
    let mut category = vec![0u32; pixel_count];
    for (class, plane) in (1u32..).zip(rest) {
        for ((best, current), &score) in best_scores.iter_mut().zip(&mut category).zip(plane) {
            if score > *best || (best.is_nan() && !score.is_nan()) {
                *best = score;
                *current = class;
            }
        }
    }

    Ok(category)
}

/// Render either kind of result; confidence masks are reduced to categories
/// first.
pub fn visualize(result: &SegmentationResult) -> Result<(RgbImage, RankedLabels)> {
    match result.masks() {
        OutputPayload::CategoryMask(_) => render(result),
        OutputPayload::ConfidenceMask(_) => {
            let category = derive_category_from_confidence(result)?;
            let derived = SegmentationResult::new(
                result.width(),
                result.height(),
                result.colored_labels().to_vec(),
                OutputPayload::CategoryMask(category),
            );
            render(&derived)
        }
    }
}

/// Fraction of channel values that differ between two images.
pub fn mismatch_ratio(rendered: &RgbImage, ground_truth: &RgbImage) -> Result<f64> {
    if rendered.dimensions() != ground_truth.dimensions() {
        return Err(SegmenterError::Validation {
            field: "ground_truth".to_string(),
            reason: format!(
                "dimensions {:?} differ from rendered {:?}",
                ground_truth.dimensions(),
                rendered.dimensions()
            ),
        });
    }

    let total = rendered.as_raw().len();
    if total == 0 {
        return Ok(0.0);
    }
    let mismatched = rendered
        .as_raw()
        .iter()
        .zip(ground_truth.as_raw())
        .filter(|(a, b)| a != b)
        .count();

    Ok(mismatched as f64 / total as f64)
}

fn category_mask(result: &SegmentationResult) -> Result<&[u32]> {
    let mask = match result.masks() {
        OutputPayload::CategoryMask(mask) => mask,
        OutputPayload::ConfidenceMask(_) => {
            return Err(SegmenterError::UnexpectedOutputType {
                expected: OutputType::CategoryMask,
                actual: OutputType::ConfidenceMask,
            })
        }
    };

    if mask.len() != result.pixel_count() {
        return Err(SegmenterError::InvalidMaskSize {
            expected: result.pixel_count(),
            actual: mask.len(),
        });
    }

    Ok(mask)
}
