use image::{DynamicImage, Rgb, RgbImage};

use image_segmenter_rs::mocks::MockInferenceProvider;
use image_segmenter_rs::{
    derive_category_from_confidence, render, renderer::rank_labels, ColoredLabel,
    InferenceProvider, OutputPayload, OutputType, SegmentationResult, SegmenterError,
    PASCAL_VOC_LABELS,
};

fn noisy_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(17, 11, |x, y| {
        Rgb([((x * 37 + y * 91 + x * y) % 256) as u8, 0, 0])
    }))
}

#[test]
fn test_category_equals_argmax_of_confidence() {
    let image = noisy_image();
    let category = MockInferenceProvider::new(OutputType::CategoryMask, &PASCAL_VOC_LABELS)
        .segment(&image)
        .unwrap();
    let confidence = MockInferenceProvider::new(OutputType::ConfidenceMask, &PASCAL_VOC_LABELS)
        .segment(&image)
        .unwrap();

    let OutputPayload::ConfidenceMask(planes) = confidence.masks() else {
        panic!("expected confidence masks");
    };
    assert_eq!(planes.len(), confidence.colored_labels().len());

    let derived = derive_category_from_confidence(&confidence).unwrap();
    assert_eq!(category.masks(), &OutputPayload::CategoryMask(derived));
    assert_eq!(category.colored_labels(), confidence.colored_labels());
}

#[test]
fn test_provider_with_missing_confidence_plane() {
    let image = noisy_image();
    let confidence = MockInferenceProvider::new(OutputType::ConfidenceMask, &PASCAL_VOC_LABELS)
        .segment(&image)
        .unwrap();

    let (width, height, labels, masks) = confidence.into_parts();
    let OutputPayload::ConfidenceMask(mut planes) = masks else {
        panic!("expected confidence masks");
    };
    planes.pop();
    let truncated =
        SegmentationResult::new(width, height, labels, OutputPayload::ConfidenceMask(planes));

    assert!(matches!(
        derive_category_from_confidence(&truncated),
        Err(SegmenterError::InconsistentClassCount {
            labels: 21,
            masks: 20
        })
    ));
}

#[test]
fn test_render_scenario() {
    let result = SegmentationResult::new(
        2,
        2,
        vec![
            ColoredLabel::new([0, 0, 0], "background"),
            ColoredLabel::new([128, 0, 0], "person"),
        ],
        OutputPayload::CategoryMask(vec![0, 0, 1, 0]),
    );

    let (image, labels) = render(&result).unwrap();
    assert_eq!(
        image.into_raw(),
        vec![0, 0, 0, 0, 0, 0, 128, 0, 0, 0, 0, 0]
    );
    assert_eq!(labels, vec!["background".to_string(), "person".to_string()]);

    let ranking = rank_labels(&result).unwrap();
    assert_eq!(ranking[0].pixels, 3);
    assert_eq!(ranking[1].pixels, 1);
}

#[test]
fn test_results_render_concurrently() {
    let provider = MockInferenceProvider::new(OutputType::CategoryMask, &PASCAL_VOC_LABELS);
    let result = provider.segment(&noisy_image()).unwrap();
    let expected = render(&result).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| render(&result).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
