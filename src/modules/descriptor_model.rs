use anyhow::Error;
use image::RgbImage;
use ndarray::Array2;

/// Aligned fixed-size face crop consumed by the descriptor model.
pub type FaceChip = RgbImage;

/// Nominal side length of an aligned face chip, in pixels.
pub const FACE_CHIP_SIZE: u32 = 150;

/// Length of the descriptor vector produced by the reference model.
pub const DESCRIPTOR_DIM: usize = 128;

/// DescriptorModel computes deep face descriptors from aligned face chips.
///
/// Chip alignment lives on the same trait because the two capabilities ship
/// together in the reference model family; both are best-effort from the
/// pipeline's point of view and any failure only costs the optional deep
/// embedding, never the enrollment.
pub trait DescriptorModel {
    /// align_chip warps the face to a fixed-size upright crop using its landmarks.
    ///
    /// # Arguments
    /// * `image` - full RGB frame
    /// * `landmarks` - (68, 2) landmark array for the face
    ///
    /// # Returns
    /// * `Result<FaceChip, Error>`
    fn align_chip(&self, image: &RgbImage, landmarks: &Array2<f32>) -> Result<FaceChip, Error>;

    /// describe returns the raw fixed-length descriptor for an aligned chip.
    ///
    /// # Arguments
    /// * `chip` - aligned face crop
    ///
    /// # Returns
    /// * `Result<Vec<f32>, Error>`
    fn describe(&self, chip: &FaceChip) -> Result<Vec<f32>, Error>;
}
