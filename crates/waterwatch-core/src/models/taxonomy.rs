//! Category taxonomy: every pollution category belongs to exactly one similarity group.
//!
//! The reconciler and the colour heuristic both consult this table. A label
//! with no group is a configuration error, never a silent "no match".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, WaterwatchError};

/// Version of the built-in table
pub const TAXONOMY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityGroup {
    WaterPollution,
    SurfacePollution,
    Clean,
}

impl SimilarityGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityGroup::WaterPollution => "water_pollution",
            SimilarityGroup::SurfacePollution => "surface_pollution",
            SimilarityGroup::Clean => "clean",
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, SimilarityGroup::Clean)
    }
}

impl fmt::Display for SimilarityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub name: String,
    pub group: SimilarityGroup,
}

impl TaxonomyEntry {
    pub fn new(name: impl Into<String>, group: SimilarityGroup) -> Self {
        Self {
            name: name.into(),
            group,
        }
    }
}

// "polluted" and "clean" are the labels of the binary classifier.
const BUILTIN: &[(&str, SimilarityGroup)] = &[
    ("plastic_pollution", SimilarityGroup::SurfacePollution),
    ("oil_spill", SimilarityGroup::SurfacePollution),
    ("sewage_discharge", SimilarityGroup::WaterPollution),
    ("turbidity", SimilarityGroup::WaterPollution),
    ("algae_bloom", SimilarityGroup::WaterPollution),
    ("polluted", SimilarityGroup::WaterPollution),
    ("clean_water", SimilarityGroup::Clean),
    ("clean", SimilarityGroup::Clean),
];

/// Versioned category → group table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    version: u32,
    groups: BTreeMap<String, SimilarityGroup>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Taxonomy {
    /// The built-in table
    pub fn builtin() -> Self {
        let groups = BUILTIN.iter().map(|(name, group)| (name.to_string(), *group)).collect();
        Self {
            version: TAXONOMY_VERSION,
            groups,
        }
    }

    /// Build a table from explicit entries, rejecting duplicates
    pub fn from_entries(
        version: u32,
        entries: impl IntoIterator<Item = TaxonomyEntry>,
    ) -> Result<Self> {
        let taxonomy = Self {
            version,
            groups: BTreeMap::new(),
        };
        taxonomy.extend(entries)
    }

    /// Register more categories. Each name may only be assigned once.
    pub fn extend(mut self, entries: impl IntoIterator<Item = TaxonomyEntry>) -> Result<Self> {
        for entry in entries {
            let name = normalize(&entry.name);
            if name.is_empty() {
                return Err(WaterwatchError::ConfigInvalid {
                    key: "taxonomy".to_string(),
                    reason: "category names must not be empty".to_string(),
                });
            }
            if self.groups.contains_key(&name) {
                return Err(WaterwatchError::DuplicateCategory { category: name });
            }
            self.groups.insert(name, entry.group);
        }
        Ok(self)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.groups.contains_key(&normalize(category))
    }

    /// Group of a category; unknown categories are a configuration error
    pub fn group_of(&self, category: &str) -> Result<SimilarityGroup> {
        self.groups.get(&normalize(category)).copied().ok_or_else(|| {
            WaterwatchError::UnknownCategory {
                category: category.trim().to_string(),
            }
        })
    }

    pub fn is_clean(&self, category: &str) -> Result<bool> {
        Ok(self.group_of(category)?.is_clean())
    }

    /// All entries, sorted by name
    pub fn entries(&self) -> Vec<TaxonomyEntry> {
        self.groups.iter().map(|(name, group)| TaxonomyEntry::new(name.clone(), *group)).collect()
    }

    /// Fail fast unless every label has a group assignment
    pub fn ensure_covers<I, S>(&self, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            self.group_of(label.as_ref())?;
        }
        Ok(())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_groups() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.version(), TAXONOMY_VERSION);
        assert_eq!(taxonomy.group_of("oil_spill").unwrap(), SimilarityGroup::SurfacePollution);
        assert_eq!(taxonomy.group_of("plastic_pollution").unwrap(), SimilarityGroup::SurfacePollution);
        assert_eq!(taxonomy.group_of("turbidity").unwrap(), SimilarityGroup::WaterPollution);
        assert_eq!(taxonomy.group_of("polluted").unwrap(), SimilarityGroup::WaterPollution);
        assert!(taxonomy.is_clean("clean").unwrap());
        assert!(taxonomy.is_clean("clean_water").unwrap());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let taxonomy = Taxonomy::builtin();
        assert_eq!(taxonomy.group_of(" Oil_Spill ").unwrap(), SimilarityGroup::SurfacePollution);
    }

    #[test]
    fn test_unknown_category_is_configuration_error() {
        let err = Taxonomy::builtin().group_of("radioactive_sludge").unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, WaterwatchError::UnknownCategory { ref category } if category == "radioactive_sludge"));
    }

    #[test]
    fn test_extend_rejects_duplicates() {
        let err = Taxonomy::builtin()
            .extend([TaxonomyEntry::new("turbidity", SimilarityGroup::SurfacePollution)])
            .unwrap_err();
        assert!(matches!(err, WaterwatchError::DuplicateCategory { .. }));
    }

    #[test]
    fn test_extend_adds_category() {
        let taxonomy = Taxonomy::builtin()
            .extend([TaxonomyEntry::new("foam", SimilarityGroup::SurfacePollution)])
            .unwrap();
        assert_eq!(taxonomy.group_of("foam").unwrap(), SimilarityGroup::SurfacePollution);
        assert_eq!(taxonomy.len(), BUILTIN.len() + 1);
    }

    #[test]
    fn test_ensure_covers() {
        let taxonomy = Taxonomy::builtin();
        assert!(taxonomy.ensure_covers(["clean", "polluted"]).is_ok());
        assert!(taxonomy.ensure_covers(vec!["clean".to_string(), "smog".to_string()]).is_err());
    }

    #[test]
    fn test_entries_are_sorted_and_unique() {
        let entries = Taxonomy::builtin().entries();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }
}
