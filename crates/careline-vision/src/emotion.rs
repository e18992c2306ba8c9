//! Emotion classification over a cropped face region.
//!
//! The classifier seam is a trait returning per-channel scores; the built-in
//! implementation is the deterministic brightness/contrast heuristic. A
//! trained model drops in behind the same trait without touching the
//! pipeline.

use image::GrayImage;

use careline_core::EmotionLabel;

/// Output channel order of a face-emotion classifier. Arg-max over a score
/// vector indexes into this.
pub const CHANNELS: [EmotionLabel; 7] = [
    EmotionLabel::Angry,
    EmotionLabel::Disgusted,
    EmotionLabel::Fearful,
    EmotionLabel::Happy,
    EmotionLabel::Surprised,
    EmotionLabel::Sad,
    EmotionLabel::Neutral,
];

/// Scores a face crop across the fixed channel set. `None` means the
/// classifier could not produce a result and the caller should fall back.
pub trait EmotionClassifier: Send + Sync {
    fn scores(&self, face: &GrayImage) -> Option<Vec<f32>>;
}

/// Pick the arg-max channel and its score.
pub fn argmax_label(scores: &[f32]) -> (EmotionLabel, f32) {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().take(CHANNELS.len()) {
        if *score > scores[best] {
            best = i;
        }
    }
    (CHANNELS[best], scores.get(best).copied().unwrap_or(0.0))
}

/// Mean brightness and contrast (standard deviation) of a crop.
fn crop_stats(face: &GrayImage) -> (f32, f32) {
    let n = face.as_raw().len().max(1) as f32;
    let mut sum = 0.0f32;
    let mut sq = 0.0f32;
    for px in face.as_raw() {
        let v = *px as f32;
        sum += v;
        sq += v * v;
    }
    let mean = sum / n;
    let variance = (sq / n - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Deterministic brightness/contrast threshold classifier.
///
/// Thresholds: brightness > 140 reads happy, < 80 sad; contrast > 60 reads
/// surprised, < 30 calm-neutral; everything else is neutral at lower
/// confidence.
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    fn pick(&self, face: &GrayImage) -> (EmotionLabel, f32) {
        let (brightness, contrast) = crop_stats(face);
        if brightness > 140.0 {
            (EmotionLabel::Happy, 0.7)
        } else if brightness < 80.0 {
            (EmotionLabel::Sad, 0.6)
        } else if contrast > 60.0 {
            (EmotionLabel::Surprised, 0.5)
        } else if contrast < 30.0 {
            (EmotionLabel::Neutral, 0.6)
        } else {
            (EmotionLabel::Neutral, 0.5)
        }
    }
}

impl EmotionClassifier for HeuristicClassifier {
    fn scores(&self, face: &GrayImage) -> Option<Vec<f32>> {
        let (label, confidence) = self.pick(face);
        let mut scores = vec![0.0; CHANNELS.len()];
        let idx = CHANNELS.iter().position(|c| *c == label)?;
        scores[idx] = confidence;
        Some(scores)
    }
}

/// Classify a crop, falling back to the heuristic when the primary
/// classifier yields nothing.
pub fn classify(classifier: &dyn EmotionClassifier, face: &GrayImage) -> (EmotionLabel, f32) {
    let scores = classifier
        .scores(face)
        .or_else(|| HeuristicClassifier.scores(face))
        .unwrap_or_default();
    if scores.is_empty() {
        return (EmotionLabel::Neutral, 0.5);
    }
    argmax_label(&scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_channel_order() {
        let mut scores = vec![0.0; 7];
        scores[3] = 0.9;
        assert_eq!(argmax_label(&scores), (EmotionLabel::Happy, 0.9));

        scores[3] = 0.1;
        scores[5] = 0.8;
        assert_eq!(argmax_label(&scores), (EmotionLabel::Sad, 0.8));
    }

    #[test]
    fn test_heuristic_brightness_thresholds() {
        let bright = GrayImage::from_pixel(32, 32, image::Luma([200]));
        assert_eq!(
            classify(&HeuristicClassifier, &bright),
            (EmotionLabel::Happy, 0.7)
        );

        let dark = GrayImage::from_pixel(32, 32, image::Luma([40]));
        assert_eq!(
            classify(&HeuristicClassifier, &dark),
            (EmotionLabel::Sad, 0.6)
        );

        let flat_mid = GrayImage::from_pixel(32, 32, image::Luma([100]));
        assert_eq!(
            classify(&HeuristicClassifier, &flat_mid),
            (EmotionLabel::Neutral, 0.6)
        );
    }

    #[test]
    fn test_heuristic_high_contrast_is_surprised() {
        // Half black, half white at mid brightness: contrast well over 60.
        let mut img = GrayImage::from_pixel(32, 32, image::Luma([0]));
        for y in 0..16 {
            for x in 0..32 {
                img.put_pixel(x, y, image::Luma([220]));
            }
        }
        assert_eq!(
            classify(&HeuristicClassifier, &img),
            (EmotionLabel::Surprised, 0.5)
        );
    }

    struct FailingClassifier;
    impl EmotionClassifier for FailingClassifier {
        fn scores(&self, _face: &GrayImage) -> Option<Vec<f32>> {
            None
        }
    }

    #[test]
    fn test_classifier_failure_falls_back_to_heuristic() {
        let bright = GrayImage::from_pixel(32, 32, image::Luma([200]));
        assert_eq!(
            classify(&FailingClassifier, &bright),
            (EmotionLabel::Happy, 0.7)
        );
    }
}
