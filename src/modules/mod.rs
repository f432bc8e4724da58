pub mod descriptor_model;
pub mod face_locator;
pub mod landmark_extractor;
