use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::Error;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One enrolled identity: directory-derived name and group label, the
/// mandatory 136-dim landmark embedding and the optional 128-dim deep
/// embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentRecord {
    pub name: String,
    pub group: String,
    pub landmark_embedding: Vec<f32>,
    pub deep_embedding: Option<Vec<f32>>,
}

/// Persisted lookup table mapping identities to their embeddings, rebuilt
/// wholesale on every enrollment run and consumed by the recognition side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EncodingStore {
    pub records: Vec<EnrollmentRecord>,
}

impl EncodingStore {
    pub fn new(records: Vec<EnrollmentRecord>) -> Self {
        EncodingStore { records }
    }

    /// from_columns builds a store from the four positionally co-indexed
    /// sequences of the legacy layout. The deep-embedding column is padded
    /// with empty slots until it matches the others; a length mismatch among
    /// the name, group and landmark columns is an error.
    ///
    /// # Arguments
    /// * `names` - identity names
    /// * `groups` - group labels, "" for ungrouped identities
    /// * `landmark_embeddings` - one 136-dim vector per identity
    /// * `deep_embeddings` - deep-embedding slots, possibly short
    ///
    /// # Returns
    /// * `Result<EncodingStore, Error>`
    pub fn from_columns(
        names: Vec<String>,
        groups: Vec<String>,
        landmark_embeddings: Vec<Vec<f32>>,
        mut deep_embeddings: Vec<Option<Vec<f32>>>,
    ) -> Result<Self, Error> {
        if groups.len() != names.len() || landmark_embeddings.len() != names.len() {
            return Err(Error::msg(format!(
                "encoding_store - column length mismatch: {} names, {} groups, {} landmark embeddings",
                names.len(),
                groups.len(),
                landmark_embeddings.len(),
            )));
        }
        if deep_embeddings.len() < names.len() {
            deep_embeddings.resize(names.len(), None);
        }

        let records = names
            .into_iter()
            .zip(groups)
            .zip(landmark_embeddings)
            .zip(deep_embeddings)
            .map(|(((name, group), landmark_embedding), deep_embedding)| EnrollmentRecord {
                name,
                group,
                landmark_embedding,
                deep_embedding,
            })
            .collect();
        Ok(EncodingStore { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// save serializes the store to a single JSON file, unconditionally
    /// overwriting any existing file.
    ///
    /// # Arguments
    /// * `path` - output file path
    ///
    /// # Returns
    /// * `Result<(), Error>`
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        info!(
            "saved {} enrollment records to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }

    /// load reads a store previously written by `save`. The round trip is
    /// lossless, including absent deep-embedding slots and single-precision
    /// embedding components.
    ///
    /// # Arguments
    /// * `path` - encodings file path
    ///
    /// # Returns
    /// * `Result<EncodingStore, Error>`
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        let store = serde_json::from_reader(BufReader::new(file))?;
        Ok(store)
    }
}
