//! Local perception: turns a raw image into an emotion observation.
//!
//! The pipeline never raises: decode failures and absent faces produce the
//! `(No Face, 0.0)` sentinel instead.

pub mod emotion;
pub mod face;

use image::GrayImage;
use tracing::debug;

use careline_core::EmotionLabel;

use emotion::{classify, EmotionClassifier, HeuristicClassifier};
use face::{expand_roi, FaceDetector};

/// Minimum plausible side for a detected face, in pixels.
const MIN_FACE_SIDE: u32 = 20;

/// ROI expansion factors around the detector window.
const ROI_SCALE_W: f32 = 1.3;
const ROI_SCALE_H: f32 = 1.5;

/// Image → (label, confidence) pipeline: decode, locate the face, expand the
/// region, classify, remap.
pub struct EmotionPipeline {
    detector: FaceDetector,
    classifier: Box<dyn EmotionClassifier>,
}

impl EmotionPipeline {
    pub fn new() -> Self {
        Self::with_classifier(Box::new(HeuristicClassifier))
    }

    pub fn with_classifier(classifier: Box<dyn EmotionClassifier>) -> Self {
        Self {
            detector: FaceDetector::default(),
            classifier,
        }
    }

    /// Detect the dominant emotion in an encoded image.
    pub fn detect_emotion(&self, image_bytes: &[u8]) -> (EmotionLabel, f32) {
        let Ok(decoded) = image::load_from_memory(image_bytes) else {
            debug!("Image decode failed, reporting no face");
            return (EmotionLabel::NoFace, 0.0);
        };
        let gray = decoded.to_luma8();

        let Some(region) = self.detector.detect(&gray) else {
            return (EmotionLabel::NoFace, 0.0);
        };
        if region.width < MIN_FACE_SIDE || region.height < MIN_FACE_SIDE {
            return (EmotionLabel::NoFace, 0.0);
        }

        let (img_w, img_h) = gray.dimensions();
        let roi = expand_roi(region, ROI_SCALE_W, ROI_SCALE_H, img_w, img_h);
        let crop: GrayImage =
            image::imageops::crop_imm(&gray, roi.x, roi.y, roi.width, roi.height).to_image();

        let (label, confidence) = classify(self.classifier.as_ref(), &crop);

        // Surprised reads are too jittery frame-to-frame to act on.
        let label = if label == EmotionLabel::Surprised {
            EmotionLabel::Neutral
        } else {
            label
        };

        debug!(
            w = region.width,
            h = region.height,
            x = region.x,
            y = region.y,
            %label,
            confidence,
            "Face classified"
        );

        (label, confidence)
    }
}

impl Default for EmotionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion::CHANNELS;

    fn encode_png(img: &GrayImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img.clone())
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn synthetic_face(frame: u8, skin: u8, eyes: u8) -> GrayImage {
        let mut img = GrayImage::from_pixel(200, 200, image::Luma([frame]));
        for y in 60..140 {
            for x in 60..140 {
                img.put_pixel(x, y, image::Luma([skin]));
            }
        }
        for y in 80..96 {
            for x in 64..136 {
                img.put_pixel(x, y, image::Luma([eyes]));
            }
        }
        img
    }

    #[test]
    fn test_undecodable_bytes_are_no_face_sentinel() {
        let pipeline = EmotionPipeline::new();
        let (label, confidence) = pipeline.detect_emotion(b"definitely not an image");
        assert_eq!(label, EmotionLabel::NoFace);
        assert_eq!(confidence, 0.0);
        assert_eq!(label.as_str(), "No Face");
    }

    #[test]
    fn test_faceless_frame_is_no_face_sentinel() {
        let pipeline = EmotionPipeline::new();
        let blank = GrayImage::from_pixel(200, 200, image::Luma([128]));
        let (label, confidence) = pipeline.detect_emotion(&encode_png(&blank));
        assert_eq!((label, confidence), (EmotionLabel::NoFace, 0.0));
    }

    #[test]
    fn test_bright_face_reads_happy() {
        let pipeline = EmotionPipeline::new();
        let img = synthetic_face(220, 180, 60);
        let (label, confidence) = pipeline.detect_emotion(&encode_png(&img));
        assert_eq!(label, EmotionLabel::Happy);
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn test_dark_face_reads_sad() {
        let pipeline = EmotionPipeline::new();
        let img = synthetic_face(70, 70, 20);
        let (label, confidence) = pipeline.detect_emotion(&encode_png(&img));
        assert_eq!(label, EmotionLabel::Sad);
        assert_eq!(confidence, 0.6);
    }

    struct SurprisedClassifier;
    impl EmotionClassifier for SurprisedClassifier {
        fn scores(&self, _face: &GrayImage) -> Option<Vec<f32>> {
            let mut scores = vec![0.0; CHANNELS.len()];
            let idx = CHANNELS
                .iter()
                .position(|c| *c == EmotionLabel::Surprised)
                .unwrap();
            scores[idx] = 0.93;
            Some(scores)
        }
    }

    #[test]
    fn test_surprised_output_remapped_to_neutral() {
        let pipeline = EmotionPipeline::with_classifier(Box::new(SurprisedClassifier));
        let img = synthetic_face(220, 180, 60);
        let (label, confidence) = pipeline.detect_emotion(&encode_png(&img));
        assert_eq!(label, EmotionLabel::Neutral);
        assert_eq!(confidence, 0.93);
    }
}
