use anyhow::Error;
use image::GrayImage;
use ndarray::Array2;

use crate::utils::coordinate::FaceBox;

/// LandmarkExtractor predicts the 68 anatomical keypoints of a detected face.
pub trait LandmarkExtractor {
    /// predict returns a (68, 2) array of pixel coordinates in the standard
    /// 68-point ordering (0..17 jaw, 36..42 left eye, 42..48 right eye, ...).
    ///
    /// # Arguments
    /// * `image` - 8-bit grayscale frame
    /// * `bbox` - face bounding box from the locator
    ///
    /// # Returns
    /// * `Result<Array2<f32>, Error>`
    fn predict(&self, image: &GrayImage, bbox: &FaceBox) -> Result<Array2<f32>, Error>;
}
