use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub type DinoId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dino {
    pub id: DinoId,
    #[serde(rename = "type")]
    pub species: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Position,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub female: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Wild,
    Tamed,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Wild, Partition::Tamed];

    pub fn label(self) -> &'static str {
        match self {
            Partition::Wild => "wild",
            Partition::Tamed => "tamed",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Species-to-records mapping for one partition.
///
/// `all_species` is what the last conversion discovered; `found` only holds the
/// species that have been loaded so far, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionRecords {
    all_species: Vec<String>,
    found: IndexMap<String, Vec<Dino>>,
}

impl PartitionRecords {
    pub fn new(all_species: Vec<String>) -> Self {
        let unique: IndexSet<String> = all_species.into_iter().collect();

        Self {
            all_species: unique.into_iter().collect(),
            found: IndexMap::new(),
        }
    }

    pub fn from_loaded(found: IndexMap<String, Vec<Dino>>) -> Self {
        Self {
            all_species: found.keys().cloned().collect(),
            found,
        }
    }

    pub fn all_species(&self) -> &[String] {
        &self.all_species
    }

    pub fn number_of_species(&self) -> usize {
        self.all_species.len()
    }

    pub fn is_loaded(&self, species: &str) -> bool {
        self.found.contains_key(species)
    }

    pub fn unloaded_species(&self) -> impl Iterator<Item = &str> {
        self.all_species
            .iter()
            .map(String::as_str)
            .filter(|name| !self.found.contains_key(*name))
    }

    /// Stores a species' records unless it is already loaded.
    ///
    /// Returns `true` when the records were stored.
    pub fn insert_species(&mut self, species: String, dinos: Vec<Dino>) -> bool {
        if self.found.contains_key(&species) {
            return false;
        }
        if !self.all_species.contains(&species) {
            self.all_species.push(species.clone());
        }
        self.found.insert(species, dinos);
        true
    }

    pub fn species(&self, name: &str) -> Option<&[Dino]> {
        self.found.get(name).map(Vec::as_slice)
    }

    pub fn loaded(&self) -> impl Iterator<Item = (&str, &[Dino])> {
        self.found
            .iter()
            .map(|(name, dinos)| (name.as_str(), dinos.as_slice()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTarget {
    pub save_file: PathBuf,
    pub output_dir: PathBuf,
}

impl ConversionTarget {
    pub fn new(save_file: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_file: save_file.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn source_name(&self) -> String {
        self.save_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.output_dir
            .join(self.source_name())
            .join(partition.label())
    }

    pub fn save_file(&self) -> &Path {
        &self.save_file
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("conversion of {partition} data failed: {message}")]
    Conversion {
        partition: Partition,
        message: String,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed records in {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// The external conversion collaborator.
///
/// Implementations are called from background threads, one partition at a time.
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        partition: Partition,
        force: bool,
        target: &ConversionTarget,
    ) -> Result<PartitionRecords, IndexError>;

    /// Records of one species, or `None` when the converter knows nothing about it.
    fn load_species(
        &self,
        partition: Partition,
        species: &str,
        target: &ConversionTarget,
    ) -> Result<Option<Vec<Dino>>, IndexError>;
}
