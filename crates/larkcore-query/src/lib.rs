use larkcore_index::{Dino, PartitionRecords};
use serde::{Deserialize, Serialize};

pub mod order;

pub use order::{apply_drop, display_order, drop_order, renumber, InsertSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Any,
    Female,
    Male,
}

impl Gender {
    const CYCLE: [Gender; 3] = [Gender::Any, Gender::Female, Gender::Male];

    pub fn step(self, delta: i32) -> Gender {
        let len = Self::CYCLE.len() as i32;
        let index = Self::CYCLE.iter().position(|g| *g == self).unwrap_or(0) as i32;
        let next = (index + delta.signum()).rem_euclid(len);
        Self::CYCLE[next as usize]
    }

    fn matches(self, female: bool) -> bool {
        match self {
            Gender::Any => true,
            Gender::Female => female,
            Gender::Male => !female,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBound {
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriterion {
    pub species: Option<String>,
    pub group: String,
    pub order: f64,
    pub min_level: Option<i32>,
    pub max_level: Option<i32>,
    pub gender: Gender,
}

impl SearchCriterion {
    pub fn for_species(species: impl Into<String>) -> Self {
        Self {
            species: Some(species.into()),
            ..Self::default()
        }
    }

    pub fn wildcard() -> Self {
        Self::default()
    }

    pub fn species_filter(&self) -> Option<&str> {
        self.species
            .as_deref()
            .map(str::trim)
            .filter(|species| !species.is_empty())
    }

    pub fn is_wildcard(&self) -> bool {
        self.species_filter().is_none()
    }

    pub fn matches(&self, dino: &Dino) -> bool {
        if let Some(level) = dino.level {
            if self.min_level.is_some_and(|min| level < min) {
                return false;
            }
            if self.max_level.is_some_and(|max| level > max) {
                return false;
            }
        }

        self.gender.matches(dino.female)
    }

    pub fn level(&self, bound: LevelBound) -> Option<i32> {
        match bound {
            LevelBound::Min => self.min_level,
            LevelBound::Max => self.max_level,
        }
    }

    /// Steps one level bound by `delta * step`.
    ///
    /// Leaving `0..=max_level` clears the bound; stepping a cleared bound up
    /// starts at 0 and stepping it down starts at `max_level`.
    pub fn step_level(&mut self, bound: LevelBound, delta: i32, step: i32, max_level: i32) {
        let diff = delta.signum() * step;
        let next = match self.level(bound) {
            Some(value) => value
                .checked_add(diff)
                .filter(|value| (0..=max_level).contains(value)),
            None if diff > 0 => Some(0),
            None => Some(max_level),
        };

        match bound {
            LevelBound::Min => self.min_level = next,
            LevelBound::Max => self.max_level = next,
        }
    }
}

/// Runs every criterion against `records` and concatenates the hits.
///
/// Records matched by several criteria appear once per criterion.
pub fn evaluate(criteria: &[SearchCriterion], records: &PartitionRecords) -> Vec<Dino> {
    let mut found = Vec::new();

    for criterion in criteria {
        match criterion.species_filter() {
            None => {
                for (_, dinos) in records.loaded() {
                    found.extend_from_slice(dinos);
                }
            }
            Some(species) => {
                if let Some(dinos) = records.species(species) {
                    found.extend(dinos.iter().filter(|d| criterion.matches(d)).cloned());
                }
            }
        }
    }

    found
}
