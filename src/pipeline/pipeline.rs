use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Error;
use image::DynamicImage;
use ndarray::Array1;
use tracing::{info, warn};

use crate::config::config::EnrollmentConfig;
use crate::helper::embedding_helper::{deep_embedding, landmark_embedding};
use crate::modules::descriptor_model::DescriptorModel;
use crate::modules::face_locator::FaceLocator;
use crate::modules::landmark_extractor::LandmarkExtractor;
use crate::store::encoding_store::{EncodingStore, EnrollmentRecord};
use crate::utils::image::{is_supported_image, read_image, to_grayscale};

/// EnrollmentPipeline owns the three collaborator handles and walks an
/// identity directory tree, producing one enrollment record per identity.
///
/// The handles are constructed once per run and reused for every image;
/// the descriptor model is optional and its absence only costs the deep
/// embeddings.
pub struct EnrollmentPipeline {
    face_locator: Box<dyn FaceLocator>,
    landmark_extractor: Box<dyn LandmarkExtractor>,
    descriptor_model: Option<Box<dyn DescriptorModel>>,
}

impl EnrollmentPipeline {
    /// new initializes new instance of the pipeline.
    pub fn new(
        face_locator: Box<dyn FaceLocator>,
        landmark_extractor: Box<dyn LandmarkExtractor>,
        descriptor_model: Option<Box<dyn DescriptorModel>>,
    ) -> Self {
        EnrollmentPipeline {
            face_locator,
            landmark_extractor,
            descriptor_model,
        }
    }

    /// run_enrollment walks the configured dataset, rebuilds the encoding
    /// store wholesale and writes it to the configured path.
    ///
    /// # Arguments
    /// * `config` - dataset root and output file path
    ///
    /// # Returns
    /// * `Result<EncodingStore, Error>`
    pub fn run_enrollment(&self, config: &EnrollmentConfig) -> Result<EncodingStore, Error> {
        info!("starting enrollment from {}", config.dataset_root.display());
        let records = self.enroll_dataset(&config.dataset_root)?;
        let store = EncodingStore::new(records);
        info!("enrollment complete, encoded {} identities", store.len());
        store.save(&config.encodings_path)?;
        Ok(store)
    }

    /// enroll_dataset traverses the identity directory hierarchy and builds
    /// one record per identity whose photo passes detection and encoding.
    ///
    /// Every per-identity failure (unreadable photo, zero or multiple
    /// detections, embedding failure) is logged and skipped; only an
    /// unenumerable dataset root is an error.
    ///
    /// # Arguments
    /// * `dataset_root` - root of the identity directory tree
    ///
    /// # Returns
    /// * `Result<Vec<EnrollmentRecord>, Error>`
    pub fn enroll_dataset(&self, dataset_root: &Path) -> Result<Vec<EnrollmentRecord>, Error> {
        if self.descriptor_model.is_none() {
            warn!("no descriptor model configured, deep embeddings will be skipped");
        }

        let entries = sorted_entries(dataset_root).map_err(|e| {
            Error::msg(format!(
                "cannot enumerate dataset root {}: {}",
                dataset_root.display(),
                e
            ))
        })?;

        let mut records = Vec::new();
        self.walk_entries(dataset_root, dataset_root, entries, &mut records);
        Ok(records)
    }

    fn walk_entries(
        &self,
        dir: &Path,
        dataset_root: &Path,
        entries: Vec<PathBuf>,
        records: &mut Vec<EnrollmentRecord>,
    ) {
        // Directories with no files are structural; only file-bearing
        // directories can enroll an identity.
        let files: Vec<&PathBuf> = entries.iter().filter(|p| p.is_file()).collect();
        if !files.is_empty() {
            if let Some(record) = self.enroll_directory(dir, dataset_root, &files) {
                records.push(record);
            }
        }

        for subdir in entries.iter().filter(|p| p.is_dir()) {
            match sorted_entries(subdir) {
                Ok(sub_entries) => self.walk_entries(subdir, dataset_root, sub_entries, records),
                Err(e) => warn!("cannot enumerate directory {}: {}", subdir.display(), e),
            }
        }
    }

    /// enroll_directory encodes the directory's first decodable image.
    ///
    /// Image files are tried in listing order until one decodes; that image
    /// is the directory's single enrollment attempt, and an encoding failure
    /// yields no record rather than falling through to later files.
    fn enroll_directory(
        &self,
        dir: &Path,
        dataset_root: &Path,
        files: &[&PathBuf],
    ) -> Option<EnrollmentRecord> {
        let (name, group) = identity_and_group(dir, dataset_root);

        for path in files.iter().filter(|p| is_supported_image(p)) {
            let img = match read_image(path) {
                Ok(img) => img,
                Err(e) => {
                    warn!("unable to read image {}, skipping: {}", path.display(), e);
                    continue;
                }
            };

            info!(
                "processing group={:?} identity={:?} file={}",
                group,
                name,
                path.display()
            );

            return match self.encode_image(&img) {
                Ok((landmark, deep)) => Some(EnrollmentRecord {
                    name,
                    group,
                    landmark_embedding: landmark.to_vec(),
                    deep_embedding: deep.map(|d| d.to_vec()),
                }),
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    None
                }
            };
        }
        None
    }

    /// encode_image produces the embeddings of the single face in an image.
    ///
    /// Requires exactly one detection; zero or multiple faces refuse the
    /// enrollment rather than guessing. The landmark embedding is mandatory,
    /// the deep embedding best-effort.
    ///
    /// # Arguments
    /// * `img` - decoded enrollment photo
    ///
    /// # Returns
    /// * `Result<(Array1<f32>, Option<Array1<f32>>), Error>`
    pub fn encode_image(
        &self,
        img: &DynamicImage,
    ) -> Result<(Array1<f32>, Option<Array1<f32>>), Error> {
        let gray = to_grayscale(img);

        let boxes = self.face_locator.detect(&gray)?;
        let bbox = match boxes.len() {
            1 => boxes[0],
            0 => return Err(Error::msg("no face detected")),
            n => {
                return Err(Error::msg(format!(
                    "found {} faces, only photos with one face can be enrolled",
                    n
                )))
            }
        };

        let landmarks = self.landmark_extractor.predict(&gray, &bbox)?;
        let landmark = landmark_embedding(&landmarks, &bbox)
            .ok_or_else(|| Error::msg("could not compute landmark embedding"))?;

        let deep = match &self.descriptor_model {
            Some(model) => {
                let rgb = img.to_rgb8();
                let chip = model.align_chip(&rgb, &landmarks).ok();
                deep_embedding(chip.as_ref(), Some(model.as_ref()))
            }
            None => None,
        };

        Ok((landmark, deep))
    }
}

/// identity_and_group derives the identity name and group label from a
/// directory path.
///
/// The identity is the leaf directory's name. The group is the parent
/// directory's name, but only when the path is at least three components
/// deep and the parent is not the dataset root itself; this distinguishes
/// the `root/<identity>` layout from `root/<group>/<identity>`. The parent
/// is compared by name, so a directory elsewhere that happens to share the
/// root's name is treated as ungrouped.
pub fn identity_and_group(dir: &Path, dataset_root: &Path) -> (String, String) {
    let identity = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut group = String::new();
    if dir.components().count() >= 3 {
        let parent_name = dir.parent().and_then(Path::file_name);
        if let Some(parent_name) = parent_name {
            if Some(parent_name) != dataset_root.file_name() {
                group = parent_name.to_string_lossy().into_owned();
            }
        }
    }
    (identity, group)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use anyhow::Error;
    use image::{GrayImage, RgbImage};
    use ndarray::Array2;

    use crate::config::config::EnrollmentConfig;
    use crate::helper::embedding_helper::{LANDMARK_EMBEDDING_DIM, NUM_LANDMARKS};
    use crate::modules::descriptor_model::{DescriptorModel, FaceChip, DESCRIPTOR_DIM};
    use crate::modules::face_locator::FaceLocator;
    use crate::modules::landmark_extractor::LandmarkExtractor;
    use crate::store::encoding_store::EncodingStore;
    use crate::utils::coordinate::FaceBox;

    use super::{identity_and_group, EnrollmentPipeline};

    struct StubLocator {
        faces: usize,
    }

    impl FaceLocator for StubLocator {
        fn detect(&self, _: &GrayImage) -> Result<Vec<FaceBox>, Error> {
            Ok(vec![FaceBox::new(10.0, 100.0, 110.0, 0.0); self.faces])
        }
    }

    struct StubLandmarks;

    impl LandmarkExtractor for StubLandmarks {
        fn predict(&self, _: &GrayImage, _: &FaceBox) -> Result<Array2<f32>, Error> {
            let mut pts = Array2::<f32>::zeros((NUM_LANDMARKS, 2));
            for i in 0..NUM_LANDMARKS {
                pts[[i, 0]] = 5.0 + (i as f32 * 1.3) % 90.0;
                pts[[i, 1]] = 10.0 + (i as f32 * 2.7) % 80.0;
            }
            Ok(pts)
        }
    }

    struct StubDescriptor;

    impl DescriptorModel for StubDescriptor {
        fn align_chip(&self, image: &RgbImage, _: &Array2<f32>) -> Result<FaceChip, Error> {
            Ok(image.clone())
        }

        fn describe(&self, _: &FaceChip) -> Result<Vec<f32>, Error> {
            Ok(vec![1.0; DESCRIPTOR_DIM])
        }
    }

    fn pipeline(faces: usize, with_descriptor: bool) -> EnrollmentPipeline {
        EnrollmentPipeline::new(
            Box::new(StubLocator { faces }),
            Box::new(StubLandmarks),
            if with_descriptor {
                Some(Box::new(StubDescriptor))
            } else {
                None
            },
        )
    }

    fn write_photo(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(32, 32, image::Rgb([128, 90, 70]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_enroll_dataset_both_layouts_in_traversal_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("face_dataset");
        write_photo(&root.join("Alice/photo.jpg"));
        write_photo(&root.join("classes/10A/Bob/photo.png"));
        write_photo(&root.join("classes/10B/Carol/photo.jpeg"));
        fs::create_dir_all(root.join("empty_structural")).unwrap();

        let records = pipeline(1, false).enroll_dataset(&root).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].name, "Alice");
        assert_eq!(records[0].group, "");
        assert_eq!(records[1].name, "Bob");
        assert_eq!(records[1].group, "10A");
        assert_eq!(records[2].name, "Carol");
        assert_eq!(records[2].group, "10B");

        for record in &records {
            assert_eq!(record.landmark_embedding.len(), LANDMARK_EMBEDDING_DIM);
            assert!(record.deep_embedding.is_none());
        }
    }

    #[test]
    fn test_two_faces_refuse_enrollment() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("face_dataset");
        write_photo(&root.join("Alice/photo.jpg"));

        let records = pipeline(2, false).enroll_dataset(&root).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_no_face_refuses_enrollment() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("face_dataset");
        write_photo(&root.join("Alice/photo.jpg"));

        let records = pipeline(0, false).enroll_dataset(&root).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_unreadable_image_falls_through_to_next() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("face_dataset");
        let dir = root.join("Alice");
        fs::create_dir_all(&dir).unwrap();
        // Sorts before the valid photo but cannot be decoded.
        fs::write(dir.join("aaa.jpg"), b"not an image").unwrap();
        write_photo(&dir.join("photo.jpg"));

        let records = pipeline(1, false).enroll_dataset(&root).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Alice");
    }

    #[test]
    fn test_non_image_files_yield_no_record() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("face_dataset");
        let dir = root.join("Alice");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), b"no photos here").unwrap();

        let records = pipeline(1, false).enroll_dataset(&root).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does_not_exist");
        assert!(pipeline(1, false).enroll_dataset(&missing).is_err());
    }

    #[test]
    fn test_encode_image_with_descriptor() {
        let img = image::DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let (landmark, deep) = pipeline(1, true).encode_image(&img).unwrap();

        assert_eq!(landmark.len(), LANDMARK_EMBEDDING_DIM);
        let deep = deep.unwrap();
        assert_eq!(deep.len(), DESCRIPTOR_DIM);
        let deep_norm = deep.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((deep_norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_run_enrollment_writes_store() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("face_dataset");
        write_photo(&root.join("Alice/photo.jpg"));

        let config = EnrollmentConfig {
            dataset_root: root,
            encodings_path: tmp.path().join("encodings.json"),
        };
        let store = pipeline(1, true).run_enrollment(&config).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.records[0].deep_embedding.is_some());

        let loaded = EncodingStore::load(&config.encodings_path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_identity_and_group_layouts() {
        let root = Path::new("face_dataset");
        assert_eq!(
            identity_and_group(Path::new("face_dataset/Alice"), root),
            ("Alice".to_string(), String::new())
        );
        assert_eq!(
            identity_and_group(Path::new("face_dataset/10A/Alice"), root),
            ("Alice".to_string(), "10A".to_string())
        );
        // Parent matching the root's own name stays ungrouped.
        assert_eq!(
            identity_and_group(Path::new("data/face_dataset/Alice"), root),
            ("Alice".to_string(), String::new())
        );
    }
}
