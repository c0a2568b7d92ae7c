// src/edge_detection.rs - Grayscale to binary edge map

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;

use crate::config::Config;
use crate::image_utils::BinaryImage;

/// Produces the binary image the analysis runs on.
///
/// Any implementation can be plugged into the pipeline; the analysis itself
/// only ever sees the returned binary image.
pub trait EdgeDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> BinaryImage;
}

/// Gaussian blur, Canny hysteresis thresholding, then a morphological
/// closing that bridges one-pixel gaps between edge fragments
#[derive(Debug, Clone)]
pub struct CannyEdgeDetector {
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub blur_sigma: f32,
    /// Closing radius in pixels (L∞ norm); 0 disables the closing
    pub closing_radius: u8,
}

impl Default for CannyEdgeDetector {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CannyEdgeDetector {
    pub fn from_config(config: &Config) -> Self {
        Self {
            low_threshold: config.edge_threshold1,
            high_threshold: config.edge_threshold2,
            blur_sigma: config.edge_blur_sigma,
            closing_radius: 1,
        }
    }
}

impl EdgeDetector for CannyEdgeDetector {
    fn detect(&self, image: &GrayImage) -> BinaryImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return GrayImage::new(width, height);
        }

        let blurred = gaussian_blur_f32(image, self.blur_sigma);
        let edges = canny(&blurred, self.low_threshold, self.high_threshold);

        if self.closing_radius > 0 {
            close(&edges, Norm::LInf, self.closing_radius)
        } else {
            edges
        }
    }
}

/// Use an already binary image as is
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEdges;

impl EdgeDetector for PassthroughEdges {
    fn detect(&self, image: &GrayImage) -> BinaryImage {
        image.clone()
    }
}
