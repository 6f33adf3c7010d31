use image::Rgb;

use crate::result::ColoredLabel;

/// Class names of the PASCAL VOC 2012 segmentation set, background first.
pub const PASCAL_VOC_LABELS: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "dining table",
    "dog",
    "horse",
    "motorbike",
    "person",
    "potted plant",
    "sheep",
    "sofa",
    "train",
    "tv",
];

/// Color of class `index` in the PASCAL VOC palette.
///
/// The bits of the index are spread over the channels from the most
/// significant bit of each channel downwards: bit 0 feeds red, bit 1 green,
/// bit 2 blue, then the next triple one bit lower.
pub fn pascal_voc_color(index: usize) -> Rgb<u8> {
    let mut rgb = [0u8; 3];
    let mut class = index;
    let mut shift = 7;
    while class > 0 && shift >= 0 {
        for (channel, value) in rgb.iter_mut().enumerate() {
            *value |= (((class >> channel) & 1) as u8) << shift;
        }
        class >>= 3;
        shift -= 1;
    }
    Rgb(rgb)
}

/// Pair each label with its palette color.
pub fn colored_labels<S: AsRef<str>>(labels: &[S]) -> Vec<ColoredLabel> {
    labels
        .iter()
        .enumerate()
        .map(|(index, label)| ColoredLabel::new(pascal_voc_color(index), label.as_ref()))
        .collect()
}

/// Labels used when the caller supplied none.
pub fn default_labels(num_classes: usize) -> Vec<String> {
    if num_classes == PASCAL_VOC_LABELS.len() {
        PASCAL_VOC_LABELS.iter().map(|s| s.to_string()).collect()
    } else {
        (0..num_classes).map(|i| format!("class_{i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_voc_palette() {
        let expected = [
            (0, [0, 0, 0]),
            (1, [128, 0, 0]),
            (2, [0, 128, 0]),
            (3, [128, 128, 0]),
            (7, [128, 128, 128]),
            (8, [64, 0, 0]),
            (11, [192, 128, 0]),
            (13, [192, 0, 128]),
            (15, [192, 128, 128]),
            (16, [0, 64, 0]),
            (18, [0, 192, 0]),
            (20, [0, 64, 128]),
        ];
        for (index, rgb) in expected {
            assert_eq!(pascal_voc_color(index), Rgb(rgb), "class {index}");
        }
    }

    #[test]
    fn test_colored_labels_are_positional() {
        let labels = colored_labels(&PASCAL_VOC_LABELS);
        assert_eq!(labels.len(), 21);
        assert_eq!(labels[0], ColoredLabel::new([0, 0, 0], "background"));
        assert_eq!(labels[15], ColoredLabel::new([192, 128, 128], "person"));
        assert_eq!(labels[13], ColoredLabel::new([192, 0, 128], "horse"));
    }

    #[test]
    fn test_default_labels() {
        assert_eq!(default_labels(21)[20], "tv");
        assert_eq!(default_labels(3), vec!["class_0", "class_1", "class_2"]);
    }
}
