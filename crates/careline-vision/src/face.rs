//! Face localization over an integral image.
//!
//! A multi-scale sliding-window scan scores each window with two Haar-like
//! band contrasts: the eye band of a frontal face reads darker than the
//! cheek band below it, and a face region is never flat. The best-scoring
//! window wins. This is a presence check tuned for webcam framings, not a
//! general-purpose detector.

use image::GrayImage;

/// Axis-aligned region in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn intersects(&self, other: &FaceRegion) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Summed-area table over a grayscale image, with squared sums for variance.
pub struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<u64>,
    squares: Vec<u64>,
}

impl IntegralImage {
    pub fn new(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        let stride = (w + 1) as usize;
        let mut sums = vec![0u64; stride * (h + 1) as usize];
        let mut squares = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h as usize {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w as usize {
                let px = img.as_raw()[y * w as usize + x] as u64;
                row_sum += px;
                row_sq += px * px;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
                squares[(y + 1) * stride + x + 1] = squares[y * stride + x + 1] + row_sq;
            }
        }

        Self {
            width: w,
            height: h,
            sums,
            squares,
        }
    }

    fn rect_sum(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    }

    /// Mean pixel value over a rectangle. The rectangle must lie within the image.
    pub fn mean(&self, x: u32, y: u32, w: u32, h: u32) -> f32 {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let stride = (self.width + 1) as usize;
        let sum = Self::rect_sum(&self.sums, stride, x, y, w, h);
        sum as f32 / (w as f32 * h as f32)
    }

    /// Pixel variance over a rectangle.
    pub fn variance(&self, x: u32, y: u32, w: u32, h: u32) -> f32 {
        let stride = (self.width + 1) as usize;
        let n = w as f32 * h as f32;
        let sum = Self::rect_sum(&self.sums, stride, x, y, w, h) as f32;
        let sq = Self::rect_sum(&self.squares, stride, x, y, w, h) as f32;
        let mean = sum / n;
        (sq / n - mean * mean).max(0.0)
    }
}

/// Multi-scale sliding-window face detector.
pub struct FaceDetector {
    pub min_size: u32,
    pub max_size: u32,
    pub scale_step: f32,
}

/// Flat windows (blank walls, covered lenses) are never faces.
const VARIANCE_FLOOR: f32 = 100.0;

/// Minimum eye-band/cheek-band brightness gap to count as face-like.
const BAND_CONTRAST_MARGIN: f32 = 10.0;

impl Default for FaceDetector {
    fn default() -> Self {
        Self {
            min_size: 30,
            max_size: 300,
            scale_step: 1.1,
        }
    }
}

impl FaceDetector {
    /// Score a square window; `None` if it does not look like a face.
    fn score_window(&self, integral: &IntegralImage, x: u32, y: u32, size: u32) -> Option<f32> {
        if integral.variance(x, y, size, size) < VARIANCE_FLOOR {
            return None;
        }

        // Horizontal bands, inset from the window edges.
        let band_x = x + (size as f32 * 0.15) as u32;
        let band_w = (size as f32 * 0.70) as u32;
        let band_h = (size as f32 * 0.20) as u32;
        if band_w == 0 || band_h == 0 {
            return None;
        }

        let eye_y = y + (size as f32 * 0.25) as u32;
        let cheek_y = y + (size as f32 * 0.55) as u32;

        let eye_mean = integral.mean(band_x, eye_y, band_w, band_h);
        let cheek_mean = integral.mean(band_x, cheek_y, band_w, band_h);

        let contrast = cheek_mean - eye_mean;
        (contrast > BAND_CONTRAST_MARGIN).then_some(contrast)
    }

    /// Locate the most face-like window, if any.
    pub fn detect(&self, img: &GrayImage) -> Option<FaceRegion> {
        let (w, h) = img.dimensions();
        if w < self.min_size || h < self.min_size {
            return None;
        }

        let integral = IntegralImage::new(img);
        let max_size = self.max_size.min(w).min(h);

        let mut best: Option<(f32, FaceRegion)> = None;
        let mut size = self.min_size;
        while size <= max_size {
            let stride = (size / 8).max(4);
            let mut y = 0;
            while y + size <= h {
                let mut x = 0;
                while x + size <= w {
                    if let Some(score) = self.score_window(&integral, x, y, size) {
                        let region = FaceRegion {
                            x,
                            y,
                            width: size,
                            height: size,
                        };
                        if best.map(|(s, _)| score > s).unwrap_or(true) {
                            best = Some((score, region));
                        }
                    }
                    x += stride;
                }
                y += stride;
            }
            let next = (size as f32 * self.scale_step) as u32;
            size = next.max(size + 1);
        }

        best.map(|(_, region)| region)
    }
}

/// Expand a face region for classification (more forehead and chin than the
/// detector window carries), clamped to the frame.
pub fn expand_roi(region: FaceRegion, scale_w: f32, scale_h: f32, img_w: u32, img_h: u32) -> FaceRegion {
    let grow_x = (region.width as f32 * (scale_w - 1.0) / 2.0) as u32;
    let grow_y = (region.height as f32 * (scale_h - 1.0) / 2.0) as u32;

    let x = region.x.saturating_sub(grow_x);
    let y = region.y.saturating_sub(grow_y);
    let width = ((region.width as f32 * scale_w) as u32).min(img_w - x);
    let height = ((region.height as f32 * scale_h) as u32).min(img_h - y);

    FaceRegion {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A bright frame with a face-like patch: mid-bright skin, a dark eye
    /// band at the expected height.
    pub(crate) fn synthetic_face(frame: u8, skin: u8, eyes: u8) -> GrayImage {
        let mut img = GrayImage::from_pixel(200, 200, image::Luma([frame]));
        for y in 60..140 {
            for x in 60..140 {
                img.put_pixel(x, y, image::Luma([skin]));
            }
        }
        // Eye band at 25%-45% of the 80px face.
        for y in 80..96 {
            for x in 64..136 {
                img.put_pixel(x, y, image::Luma([eyes]));
            }
        }
        img
    }

    #[test]
    fn test_integral_mean_and_variance() {
        let img = GrayImage::from_pixel(10, 10, image::Luma([40]));
        let integral = IntegralImage::new(&img);
        assert_eq!(integral.mean(0, 0, 10, 10), 40.0);
        assert_eq!(integral.variance(2, 2, 5, 5), 0.0);
    }

    #[test]
    fn test_uniform_image_has_no_face() {
        let img = GrayImage::from_pixel(200, 200, image::Luma([128]));
        assert!(FaceDetector::default().detect(&img).is_none());
    }

    #[test]
    fn test_synthetic_face_detected_near_patch() {
        let img = synthetic_face(220, 180, 60);
        let region = FaceDetector::default()
            .detect(&img)
            .expect("synthetic face should be detected");
        let truth = FaceRegion {
            x: 60,
            y: 60,
            width: 80,
            height: 80,
        };
        assert!(region.intersects(&truth), "detected {region:?}");
    }

    #[test]
    fn test_tiny_image_rejected() {
        let img = GrayImage::from_pixel(20, 20, image::Luma([128]));
        assert!(FaceDetector::default().detect(&img).is_none());
    }

    #[test]
    fn test_expand_roi_clamps_to_frame() {
        let region = FaceRegion {
            x: 5,
            y: 5,
            width: 100,
            height: 100,
        };
        let expanded = expand_roi(region, 1.3, 1.5, 120, 120);
        assert_eq!(expanded.x, 0);
        assert_eq!(expanded.y, 0);
        assert!(expanded.x + expanded.width <= 120);
        assert!(expanded.y + expanded.height <= 120);

        let inner = FaceRegion {
            x: 50,
            y: 60,
            width: 40,
            height: 40,
        };
        let expanded = expand_roi(inner, 1.3, 1.5, 200, 200);
        assert!(expanded.width > inner.width);
        assert!(expanded.height > inner.height);
        assert!(expanded.x < inner.x && expanded.y < inner.y);
    }
}
