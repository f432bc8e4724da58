use std::path::Path;

use anyhow::Error;
use image::{DynamicImage, GrayImage};

/// Image file extensions accepted by the dataset walker, matched case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// read_image loads and decodes an image file.
///
/// # Arguments
/// * `path` - path to the image file
///
/// # Returns
/// * `Result<DynamicImage, Error>`
pub fn read_image(path: &Path) -> Result<DynamicImage, Error> {
    let img = image::open(path)?;
    Ok(img)
}

/// decode_image decodes an in-memory encoded image.
///
/// # Arguments
/// * `im_bytes` - encoded image bytes
///
/// # Returns
/// * `Result<DynamicImage, Error>`
pub fn decode_image(im_bytes: &[u8]) -> Result<DynamicImage, Error> {
    let img = image::load_from_memory(im_bytes)?;
    Ok(img)
}

/// to_grayscale converts a decoded image to an 8-bit grayscale buffer.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// is_supported_image checks a path's extension against `IMAGE_EXTENSIONS`.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
