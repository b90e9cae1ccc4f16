//! Color harmony model: themed color families and weighted palettes drawn from them.

use std::fmt;

use clap::ValueEnum;
use rand::Rng;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CeramicsError;

/// Largest palette we hand out.
pub const MAX_PALETTE_COLORS: usize = 4;

/// Family used when a ceramic type has no colors of its own.
pub const DEFAULT_FAMILY: &str = "quantum";

/// Guard for the four color rejection loop. Every family carries at least
/// four distinct colors, so this is never reached in practice.
const MAX_SAMPLING_ATTEMPTS: usize = 256;

/// Thematic ceramic types, each selecting a color family.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeramicType {
    /// Probability and wave function themes
    Quantum,
    /// Higher dimensional geometry
    Dimensional,
    /// Stars and nebulae
    Stellar,
    /// Planets and atmospheres
    Planetary,
    /// Living and hybrid matter
    Biologic,
    /// Raw energy fields
    Energy,
    /// Time and causality
    Temporal,
}

impl CeramicType {
    /// Every ceramic type.
    pub const ALL: [CeramicType; 7] = [
        CeramicType::Quantum,
        CeramicType::Dimensional,
        CeramicType::Stellar,
        CeramicType::Planetary,
        CeramicType::Biologic,
        CeramicType::Energy,
        CeramicType::Temporal,
    ];

    /// The tag used to key the color family table.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Quantum => "quantum",
            Self::Dimensional => "dimensional",
            Self::Stellar => "stellar",
            Self::Planetary => "planetary",
            Self::Biologic => "biologic",
            Self::Energy => "energy",
            Self::Temporal => "temporal",
        }
    }

    /// Uniform pick over all types.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&CeramicType::Quantum)
    }
}

impl fmt::Display for CeramicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A named group of related colors within a family.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorSubcategory {
    /// Sub-category tag, eg `primary`
    pub name: String,
    /// Color descriptors, in table order
    pub colors: Vec<String>,
}

/// All sub-categories for one ceramic type.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorFamily {
    /// The ceramic type tag this family belongs to
    pub ceramic_type: String,
    /// Sub-categories, in table order
    pub subcategories: Vec<ColorSubcategory>,
}

impl ColorFamily {
    fn distinct_colors(&self) -> Vec<&String> {
        let mut seen: Vec<&String> = Vec::new();
        for color in self.subcategories.iter().flat_map(|sub| sub.colors.iter()) {
            if !seen.contains(&color) {
                seen.push(color);
            }
        }
        seen
    }
}

/// What to ask the harmony model for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PaletteRequest {
    /// Family to draw from
    pub ceramic_type: CeramicType,
    /// Number of colors, 1 to 4
    pub count: usize,
}

/// A small set of harmonious colors with display weights.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Palette {
    /// Distinct color descriptors, dominant first
    pub colors: Vec<String>,
    /// One weight per color, summing to 1.0
    pub weights: Vec<f64>,
}

impl Palette {
    /// The dominant color.
    pub fn primary(&self) -> Option<&str> {
        self.colors.first().map(String::as_str)
    }
}

/// Display weights for a palette of `num_colors` colors.
pub fn color_weights(num_colors: usize) -> &'static [f64] {
    match num_colors {
        0 | 1 => &[1.0],
        2 => &[0.6, 0.4],
        3 => &[0.5, 0.3, 0.2],
        _ => &[0.4, 0.3, 0.2, 0.1],
    }
}

/// The color family table.
#[derive(Clone, Debug)]
pub struct ColorFamilies {
    families: Vec<ColorFamily>,
    default_index: usize,
}

impl ColorFamilies {
    /// Parse the table that ships with the crate.
    pub fn bundled() -> Result<Self, CeramicsError> {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/color_families.json"));
        Self::from_json(raw)
    }

    /// Parse and validate a table from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, CeramicsError> {
        let families: Vec<ColorFamily> = serde_json::from_str(raw)?;
        Self::new(families)
    }

    /// Validate a set of families.
    ///
    /// Each family needs three non-empty sub-categories (three color
    /// palettes sample distinct sub-categories) and four distinct colors.
    pub fn new(families: Vec<ColorFamily>) -> Result<Self, CeramicsError> {
        for family in &families {
            if family.subcategories.len() < 3 {
                return Err(CeramicsError::Vocabulary(format!(
                    "color family {} needs at least 3 sub-categories",
                    family.ceramic_type
                )));
            }
            if let Some(empty) = family.subcategories.iter().find(|s| s.colors.is_empty()) {
                return Err(CeramicsError::Vocabulary(format!(
                    "sub-category {} of {} has no colors",
                    empty.name, family.ceramic_type
                )));
            }
            if family.distinct_colors().len() < MAX_PALETTE_COLORS {
                return Err(CeramicsError::Vocabulary(format!(
                    "color family {} needs at least {MAX_PALETTE_COLORS} distinct colors",
                    family.ceramic_type
                )));
            }
        }
        let default_index = families
            .iter()
            .position(|family| family.ceramic_type == DEFAULT_FAMILY)
            .ok_or_else(|| {
                CeramicsError::Vocabulary(format!("missing default color family {DEFAULT_FAMILY}"))
            })?;
        Ok(Self {
            families,
            default_index,
        })
    }

    /// Every family, in table order.
    pub fn families(&self) -> &[ColorFamily] {
        &self.families
    }

    /// The family for a tag, falling back to the default family.
    pub fn family(&self, tag: &str) -> &ColorFamily {
        match self.families.iter().find(|family| family.ceramic_type == tag) {
            Some(family) => family,
            None => {
                warn!("No specific colors found for {tag}, using {DEFAULT_FAMILY} type instead");
                &self.families[self.default_index]
            }
        }
    }

    /// Draw `num_colors` harmonious colors (random 1..=4 when `None`).
    pub fn harmonic_colors<R: Rng + ?Sized>(
        &self,
        ceramic_type: CeramicType,
        num_colors: Option<usize>,
        rng: &mut R,
    ) -> Vec<String> {
        self.harmonic_colors_for_tag(ceramic_type.tag(), num_colors, rng)
    }

    /// Same as [`ColorFamilies::harmonic_colors`], keyed by raw family tag.
    pub fn harmonic_colors_for_tag<R: Rng + ?Sized>(
        &self,
        tag: &str,
        num_colors: Option<usize>,
        rng: &mut R,
    ) -> Vec<String> {
        let count = num_colors
            .unwrap_or_else(|| rng.random_range(1..=MAX_PALETTE_COLORS))
            .clamp(1, MAX_PALETTE_COLORS);
        let family = self.family(tag);

        let colors = match count {
            1 => family
                .subcategories
                .first()
                .and_then(|sub| sub.colors.choose(rng))
                .cloned()
                .into_iter()
                .collect(),
            2 | 3 => Self::one_per_subcategory(family, count, rng),
            _ => Self::rejection_sample(family, count, rng),
        };
        debug!("Harmonic colors for {tag}: {colors:?}");
        colors
    }

    /// Sample `count` distinct sub-categories and draw one unseen color from each.
    fn one_per_subcategory<R: Rng + ?Sized>(
        family: &ColorFamily,
        count: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let picked = rand::seq::index::sample(rng, family.subcategories.len(), count);
        let mut chosen: Vec<String> = Vec::with_capacity(count);
        for index in picked.into_iter() {
            let unseen: Vec<&String> = family.subcategories[index]
                .colors
                .iter()
                .filter(|color| !chosen.contains(*color))
                .collect();
            if let Some(color) = unseen.choose(rng) {
                chosen.push((*color).clone());
            }
        }
        Self::fill_from_table(family, &mut chosen, count);
        chosen
    }

    fn rejection_sample<R: Rng + ?Sized>(
        family: &ColorFamily,
        count: usize,
        rng: &mut R,
    ) -> Vec<String> {
        let mut chosen: Vec<String> = Vec::with_capacity(count);
        let mut attempts = 0;
        while chosen.len() < count && attempts < MAX_SAMPLING_ATTEMPTS {
            attempts += 1;
            let Some(color) = family
                .subcategories
                .choose(rng)
                .and_then(|sub| sub.colors.choose(rng))
            else {
                continue;
            };
            if !chosen.contains(color) {
                chosen.push(color.clone());
            }
        }
        if chosen.len() < count {
            warn!(
                "Gave up sampling {} colors after {attempts} attempts",
                family.ceramic_type
            );
            Self::fill_from_table(family, &mut chosen, count);
        }
        chosen
    }

    /// Top up with the first unseen colors in table order.
    fn fill_from_table(family: &ColorFamily, chosen: &mut Vec<String>, count: usize) {
        for color in family.distinct_colors() {
            if chosen.len() >= count {
                break;
            }
            if !chosen.contains(color) {
                chosen.push(color.clone());
            }
        }
    }

    /// Draw a weighted palette.
    pub fn palette<R: Rng + ?Sized>(&self, request: PaletteRequest, rng: &mut R) -> Palette {
        let colors = self.harmonic_colors(request.ceramic_type, Some(request.count), rng);
        let weights = color_weights(colors.len()).to_vec();
        Palette { colors, weights }
    }

    /// A palette of random size from a random (or the given) ceramic type.
    pub fn random_palette<R: Rng + ?Sized>(
        &self,
        ceramic_type: Option<CeramicType>,
        rng: &mut R,
    ) -> (Palette, CeramicType) {
        let ceramic_type = ceramic_type.unwrap_or_else(|| CeramicType::random(rng));
        let count = rng.random_range(1..=MAX_PALETTE_COLORS);
        let palette = self.palette(
            PaletteRequest {
                ceramic_type,
                count,
            },
            rng,
        );
        (palette, ceramic_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn families() -> ColorFamilies {
        ColorFamilies::bundled().expect("bundled color families should parse")
    }

    #[test]
    fn weights_sum_to_one_and_never_increase() {
        for count in 1..=MAX_PALETTE_COLORS {
            let weights = color_weights(count);
            assert_eq!(weights.len(), count);
            let total: f64 = weights.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "{count}: {total}");
            assert!(weights.windows(2).all(|pair| pair[0] >= pair[1]));
        }
    }

    #[test]
    fn bundled_table_has_every_type() {
        let table = families();
        for ceramic_type in CeramicType::ALL {
            assert_eq!(table.family(ceramic_type.tag()).ceramic_type, ceramic_type.tag());
        }
    }

    #[test]
    fn harmonic_colors_have_requested_size_and_are_distinct() {
        let table = families();
        let mut rng = StdRng::seed_from_u64(42);
        for ceramic_type in CeramicType::ALL {
            for count in 1..=MAX_PALETTE_COLORS {
                for _ in 0..50 {
                    let colors = table.harmonic_colors(ceramic_type, Some(count), &mut rng);
                    assert_eq!(colors.len(), count, "{ceramic_type} x{count}");
                    let unique: HashSet<_> = colors.iter().collect();
                    assert_eq!(unique.len(), count, "{ceramic_type}: {colors:?}");
                }
            }
        }
    }

    #[test]
    fn single_color_comes_from_first_subcategory() {
        let table = families();
        let mut rng = StdRng::seed_from_u64(1);
        let first = &table.family("stellar").subcategories[0].colors;
        for _ in 0..30 {
            let colors = table.harmonic_colors(CeramicType::Stellar, Some(1), &mut rng);
            assert!(first.contains(&colors[0]));
        }
    }

    #[test]
    fn two_and_three_colors_use_distinct_subcategories() {
        let table = families();
        let family = table.family("temporal");
        let mut rng = StdRng::seed_from_u64(9);
        for count in [2, 3] {
            for _ in 0..30 {
                let colors = table.harmonic_colors(CeramicType::Temporal, Some(count), &mut rng);
                let subcategories: HashSet<_> = colors
                    .iter()
                    .filter_map(|color| {
                        family
                            .subcategories
                            .iter()
                            .position(|sub| sub.colors.contains(color))
                    })
                    .collect();
                assert_eq!(subcategories.len(), count);
            }
        }
    }

    #[test]
    fn omitted_count_stays_in_range() {
        let table = families();
        let mut rng = StdRng::seed_from_u64(77);
        let sizes: HashSet<_> = (0..200)
            .map(|_| table.harmonic_colors(CeramicType::Energy, None, &mut rng).len())
            .collect();
        assert_eq!(sizes, (1..=MAX_PALETTE_COLORS).collect());
    }

    #[test]
    fn unknown_family_falls_back_to_default() {
        let table = families();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            assert_eq!(table.family("ceramic-of-mystery").ceramic_type, DEFAULT_FAMILY);
        }
        let quantum: Vec<_> = table
            .family(DEFAULT_FAMILY)
            .subcategories
            .iter()
            .flat_map(|sub| sub.colors.clone())
            .collect();
        for color in table.harmonic_colors_for_tag("ceramic-of-mystery", Some(4), &mut rng) {
            assert!(quantum.contains(&color));
        }
    }

    #[test]
    fn missing_family_in_custom_table_falls_back() {
        let raw = r#"[
            {"ceramic_type": "quantum", "subcategories": [
                {"name": "a", "colors": ["one", "two"]},
                {"name": "b", "colors": ["three"]},
                {"name": "c", "colors": ["four", "five"]}
            ]}
        ]"#;
        let table = ColorFamilies::from_json(raw).expect("valid table");
        let mut rng = StdRng::seed_from_u64(4);
        let colors = table.harmonic_colors(CeramicType::Energy, Some(4), &mut rng);
        assert_eq!(colors.len(), 4);
        let unique: HashSet<_> = colors.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn table_without_default_family_is_rejected() {
        let raw = r#"[
            {"ceramic_type": "energy", "subcategories": [
                {"name": "a", "colors": ["one", "two"]},
                {"name": "b", "colors": ["three"]},
                {"name": "c", "colors": ["four"]}
            ]}
        ]"#;
        assert!(ColorFamilies::from_json(raw).is_err());
    }

    #[test]
    fn thin_family_is_rejected() {
        let raw = r#"[
            {"ceramic_type": "quantum", "subcategories": [
                {"name": "a", "colors": ["one"]},
                {"name": "b", "colors": ["one"]},
                {"name": "c", "colors": ["two"]}
            ]}
        ]"#;
        assert!(ColorFamilies::from_json(raw).is_err());
    }

    #[test]
    fn palette_weights_match_colors() {
        let table = families();
        let mut rng = StdRng::seed_from_u64(8);
        for count in 1..=MAX_PALETTE_COLORS {
            let palette = table.palette(
                PaletteRequest {
                    ceramic_type: CeramicType::Biologic,
                    count,
                },
                &mut rng,
            );
            assert_eq!(palette.colors.len(), palette.weights.len());
            assert_eq!(palette.weights, color_weights(count));
            assert!(palette.primary().is_some());
        }
    }
}
