//! Phrase banks the prompt engine draws from, loaded from a bundled JSON table.

use std::fmt;
use std::path::Path;

use rand::Rng;
use rand::prelude::*;
use serde::Deserialize;

use crate::error::CeramicsError;

/// The semantic axes a prompt draws one phrase from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum VocabularyAxis {
    /// Generic subject framing
    BaseDescriptions,
    /// Clay, glaze and matter
    Materials,
    /// Form and geometry
    Styles,
    /// Light setup
    Lighting,
    /// Camera and capture
    CameraSettings,
    /// Framing of the artifact
    CompositionSettings,
    /// Speculative technology
    TechnologicalAspects,
    /// Who made it
    AlienCivilizations,
    /// Physics on display
    ScientificPrinciples,
    /// What it is for
    CosmicPurposes,
}

impl VocabularyAxis {
    /// Every axis, in table order.
    pub const ALL: [VocabularyAxis; 10] = [
        VocabularyAxis::BaseDescriptions,
        VocabularyAxis::Materials,
        VocabularyAxis::Styles,
        VocabularyAxis::Lighting,
        VocabularyAxis::CameraSettings,
        VocabularyAxis::CompositionSettings,
        VocabularyAxis::TechnologicalAspects,
        VocabularyAxis::AlienCivilizations,
        VocabularyAxis::ScientificPrinciples,
        VocabularyAxis::CosmicPurposes,
    ];

    /// The key this axis uses in the JSON table.
    pub fn key(self) -> &'static str {
        match self {
            Self::BaseDescriptions => "base_descriptions",
            Self::Materials => "materials",
            Self::Styles => "styles",
            Self::Lighting => "lighting",
            Self::CameraSettings => "camera_settings",
            Self::CompositionSettings => "composition_settings",
            Self::TechnologicalAspects => "technological_aspects",
            Self::AlienCivilizations => "alien_civilizations",
            Self::ScientificPrinciples => "scientific_principles",
            Self::CosmicPurposes => "cosmic_purposes",
        }
    }
}

impl fmt::Display for VocabularyAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One top level classification category.
///
/// A category either lists descriptions directly or splits them by scale
/// (eg "Cosmic Scale" → Stellar / Planetary / Human).
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationCategory {
    /// Display name of the category
    pub category: String,
    /// Descriptions of a flat category
    #[serde(default)]
    pub descriptions: Vec<String>,
    /// Sub-scales of a two-level category
    #[serde(default)]
    pub scales: Vec<ClassificationScale>,
}

/// A sub-scale of a two-level classification category.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationScale {
    /// Display name of the scale
    pub scale: String,
    /// Descriptions at this scale
    pub descriptions: Vec<String>,
}

/// The result of a classification draw.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Classification {
    /// Category that was picked
    pub category: String,
    /// Sub-scale, for two-level categories only
    pub scale: Option<String>,
    /// The description drawn
    pub description: String,
}

/// Static phrase banks, one list per [`VocabularyAxis`] plus the classification taxonomy.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyBank {
    base_descriptions: Vec<String>,
    materials: Vec<String>,
    styles: Vec<String>,
    lighting: Vec<String>,
    camera_settings: Vec<String>,
    composition_settings: Vec<String>,
    technological_aspects: Vec<String>,
    alien_civilizations: Vec<String>,
    scientific_principles: Vec<String>,
    cosmic_purposes: Vec<String>,
    classifications: Vec<ClassificationCategory>,
}

impl VocabularyBank {
    /// Parse the table that ships with the crate.
    pub fn bundled() -> Result<Self, CeramicsError> {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/vocabulary.json"));
        Self::from_json(raw)
    }

    /// Parse and validate a table from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, CeramicsError> {
        let bank: Self = serde_json::from_str(raw)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Load an operator supplied table.
    pub fn from_path(path: &Path) -> Result<Self, CeramicsError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CeramicsError::Vocabulary(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    fn validate(&self) -> Result<(), CeramicsError> {
        for axis in VocabularyAxis::ALL {
            if self.phrases(axis).is_empty() {
                return Err(CeramicsError::Vocabulary(format!("axis {axis} has no phrases")));
            }
        }
        if self.classifications.is_empty() {
            return Err(CeramicsError::Vocabulary(
                "no classification categories defined".to_string(),
            ));
        }
        for entry in &self.classifications {
            match (entry.descriptions.is_empty(), entry.scales.is_empty()) {
                (false, true) => {}
                (true, false) => {
                    if let Some(scale) = entry.scales.iter().find(|s| s.descriptions.is_empty()) {
                        return Err(CeramicsError::Vocabulary(format!(
                            "scale {} of {} has no descriptions",
                            scale.scale, entry.category
                        )));
                    }
                }
                _ => {
                    return Err(CeramicsError::Vocabulary(format!(
                        "category {} needs either descriptions or scales",
                        entry.category
                    )));
                }
            }
        }
        Ok(())
    }

    /// The phrase list for an axis.
    pub fn phrases(&self, axis: VocabularyAxis) -> &[String] {
        match axis {
            VocabularyAxis::BaseDescriptions => &self.base_descriptions,
            VocabularyAxis::Materials => &self.materials,
            VocabularyAxis::Styles => &self.styles,
            VocabularyAxis::Lighting => &self.lighting,
            VocabularyAxis::CameraSettings => &self.camera_settings,
            VocabularyAxis::CompositionSettings => &self.composition_settings,
            VocabularyAxis::TechnologicalAspects => &self.technological_aspects,
            VocabularyAxis::AlienCivilizations => &self.alien_civilizations,
            VocabularyAxis::ScientificPrinciples => &self.scientific_principles,
            VocabularyAxis::CosmicPurposes => &self.cosmic_purposes,
        }
    }

    /// The classification taxonomy, in table order.
    pub fn classifications(&self) -> &[ClassificationCategory] {
        &self.classifications
    }

    /// Uniform pick from an axis.
    pub fn draw<R: Rng + ?Sized>(&self, axis: VocabularyAxis, rng: &mut R) -> &str {
        // validate() guarantees every axis is non-empty
        self.phrases(axis)
            .choose(rng)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Pick a category uniformly, then a scale (if it has any), then a description.
    pub fn draw_classification<R: Rng + ?Sized>(&self, rng: &mut R) -> Classification {
        let Some(entry) = self.classifications.choose(rng) else {
            return Classification {
                category: String::new(),
                scale: None,
                description: String::new(),
            };
        };

        let (scale, descriptions) = match entry.scales.choose(rng) {
            Some(scale) => (Some(scale.scale.clone()), &scale.descriptions),
            None => (None, &entry.descriptions),
        };

        Classification {
            category: entry.category.clone(),
            scale,
            description: descriptions.choose(rng).cloned().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn bundled_table_loads() {
        let bank = VocabularyBank::bundled().expect("bundled vocabulary should parse");
        for axis in VocabularyAxis::ALL {
            assert!(!bank.phrases(axis).is_empty(), "{axis} is empty");
        }
        assert_eq!(bank.classifications().len(), 8);
        let cosmic = bank
            .classifications()
            .iter()
            .find(|c| c.category == "Cosmic Scale")
            .expect("cosmic scale category");
        let scales: Vec<_> = cosmic.scales.iter().map(|s| s.scale.as_str()).collect();
        assert_eq!(scales, vec!["Stellar", "Planetary", "Human"]);
    }

    #[test]
    fn draws_come_from_the_axis() {
        let bank = VocabularyBank::bundled().expect("bundled vocabulary should parse");
        let mut rng = StdRng::seed_from_u64(11);
        for axis in VocabularyAxis::ALL {
            for _ in 0..20 {
                let phrase = bank.draw(axis, &mut rng);
                assert!(bank.phrases(axis).iter().any(|p| p == phrase));
            }
        }
    }

    #[test]
    fn classification_reports_scale_only_for_two_level_categories() {
        let bank = VocabularyBank::bundled().expect("bundled vocabulary should parse");
        let mut rng = StdRng::seed_from_u64(5);
        let mut saw_scale = false;
        for _ in 0..500 {
            let drawn = bank.draw_classification(&mut rng);
            let entry = bank
                .classifications()
                .iter()
                .find(|c| c.category == drawn.category)
                .expect("drawn category exists");
            match &drawn.scale {
                Some(scale) => {
                    saw_scale = true;
                    let scale = entry
                        .scales
                        .iter()
                        .find(|s| &s.scale == scale)
                        .expect("drawn scale exists");
                    assert!(scale.descriptions.contains(&drawn.description));
                }
                None => {
                    assert!(entry.scales.is_empty());
                    assert!(entry.descriptions.contains(&drawn.description));
                }
            }
        }
        assert!(saw_scale);
    }

    #[test]
    fn unknown_axis_key_is_rejected() {
        let raw = bundled_json_with("\"lightning\": [\"zap\"],");
        assert!(matches!(
            VocabularyBank::from_json(&raw),
            Err(CeramicsError::Vocabulary(_))
        ));
    }

    #[test]
    fn empty_axis_is_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/data/vocabulary.json"
        )))
        .expect("valid json");
        value["styles"] = serde_json::json!([]);
        let err = VocabularyBank::from_json(&value.to_string()).expect_err("empty styles");
        assert!(err.to_string().contains("styles"));
    }

    fn bundled_json_with(extra: &str) -> String {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/vocabulary.json"));
        raw.replacen('{', &format!("{{{extra}"), 1)
    }
}
