use serde::{Deserialize, Serialize};

/// Face bounding box in pixel coordinates, (top, right, bottom, left) order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FaceBox {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl FaceBox {
    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        FaceBox {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}
