use anyhow::Error;
use image::GrayImage;

use crate::utils::coordinate::FaceBox;

/// FaceLocator finds face bounding boxes in a grayscale frame.
///
/// Implemented by an external detector (HOG, CNN, ...); the pipeline only
/// relies on the boxes it returns and enrolls a photo when there is exactly
/// one of them.
pub trait FaceLocator {
    /// detect returns the bounding boxes of every face found in the image.
    ///
    /// # Arguments
    /// * `image` - 8-bit grayscale frame
    ///
    /// # Returns
    /// * `Result<Vec<FaceBox>, Error>`
    fn detect(&self, image: &GrayImage) -> Result<Vec<FaceBox>, Error>;
}
