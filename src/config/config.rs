use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const DEFAULT_DATASET_ROOT: &str = "face_dataset";
const DEFAULT_ENCODINGS_FILE: &str = "encodings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentConfig {
    pub dataset_root: PathBuf,
    pub encodings_path: PathBuf,
}

impl EnrollmentConfig {
    pub fn new() -> Self {
        EnrollmentConfig {
            dataset_root: PathBuf::from(DEFAULT_DATASET_ROOT),
            encodings_path: PathBuf::from(DEFAULT_ENCODINGS_FILE),
        }
    }

    /// from_env builds a config from the defaults with `ENROLL_DATASET_PATH`
    /// and `ENROLL_ENCODINGS_FILE` environment overrides.
    pub fn from_env() -> Self {
        let mut config = EnrollmentConfig::new();
        if let Ok(root) = std::env::var("ENROLL_DATASET_PATH") {
            config.dataset_root = PathBuf::from(root);
        }
        if let Ok(path) = std::env::var("ENROLL_ENCODINGS_FILE") {
            config.encodings_path = PathBuf::from(path);
        }
        config
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        EnrollmentConfig::new()
    }
}
