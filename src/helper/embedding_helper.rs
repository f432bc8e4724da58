use ndarray::{s, Array1, Array2, Axis};

use crate::modules::descriptor_model::{DescriptorModel, FaceChip};
use crate::utils::coordinate::FaceBox;

/// Number of landmarks in the standard face shape.
pub const NUM_LANDMARKS: usize = 68;

/// Length of the geometric landmark embedding (two components per landmark).
pub const LANDMARK_EMBEDDING_DIM: usize = NUM_LANDMARKS * 2;

const EPS: f32 = 1e-6;

/// landmark_embedding converts raw landmark points into a scale and
/// position invariant 136-dim vector.
///
/// Points are centroid-centered, divided by the inter-eye distance (falling
/// back to the bounding-box diagonal when the eyes coincide), flattened in
/// (x0, y0, x1, y1, ...) order and L2-normalized when the norm exceeds 1e-6.
/// Returns `None` on malformed input or any non-finite result; the caller
/// treats `None` as "skip this face".
///
/// # Arguments
/// * `points` - (68, 2) landmark array in pixel coordinates
/// * `bbox` - face bounding box, used only for the degenerate-scale fallback
///
/// # Returns
/// * `Option<Array1<f32>>`
pub fn landmark_embedding(points: &Array2<f32>, bbox: &FaceBox) -> Option<Array1<f32>> {
    if points.nrows() != NUM_LANDMARKS || points.ncols() != 2 {
        return None;
    }

    let centroid = points.mean_axis(Axis(0))?;
    // Eye index ranges in the standard 68-point ordering.
    let left_eye = points.slice(s![36..42, ..]).mean_axis(Axis(0))?;
    let right_eye = points.slice(s![42..48, ..]).mean_axis(Axis(0))?;

    let mut scale = (right_eye[0] - left_eye[0]).hypot(right_eye[1] - left_eye[1]);
    if scale <= EPS {
        scale = bbox.width().max(1.0).hypot(bbox.height().max(1.0));
    }

    let mut flat: Vec<f32> = Vec::with_capacity(LANDMARK_EMBEDDING_DIM);
    for row in points.rows() {
        flat.push((row[0] - centroid[0]) / scale);
        flat.push((row[1] - centroid[1]) / scale);
    }

    let embedding = l2_normalize(Array1::from(flat));
    if !embedding.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(embedding)
}

/// deep_embedding returns the normalized deep descriptor of an aligned face
/// chip, or `None` when the chip or the model is unavailable or the model
/// fails. Deep embeddings are optional enrichment; every failure here is
/// swallowed rather than surfaced.
///
/// # Arguments
/// * `chip` - aligned face crop, if one could be produced
/// * `model` - descriptor model handle, if one is configured
///
/// # Returns
/// * `Option<Array1<f32>>`
pub fn deep_embedding(
    chip: Option<&FaceChip>,
    model: Option<&dyn DescriptorModel>,
) -> Option<Array1<f32>> {
    let chip = chip?;
    let model = model?;

    let raw = model.describe(chip).ok()?;
    let embedding = l2_normalize(Array1::from(raw));
    if !embedding.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(embedding)
}

/// l2_normalize scales a vector to unit norm when its norm exceeds 1e-6;
/// near-zero vectors are returned unchanged.
fn l2_normalize(mut v: Array1<f32>) -> Array1<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > EPS {
        v.mapv_inplace(|x| x / norm);
    }
    v
}
