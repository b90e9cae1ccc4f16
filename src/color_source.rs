//! Where the dominant color of each prompt comes from.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::prelude::*;
use tracing::debug;

use crate::palette::{CeramicType, ColorFamilies};

/// Tracks which caller supplied colors have been used.
///
/// Unused colors are drawn first; once every color has appeared at least
/// once, draws resample uniformly from the full list.
#[derive(Clone, Debug, Default)]
pub struct ColorUsageLedger {
    requested_colors: Vec<String>,
    used: HashSet<String>,
    usage_count: HashMap<String, usize>,
}

impl ColorUsageLedger {
    /// Start a ledger over the requested colors.
    pub fn new(requested_colors: Vec<String>) -> Self {
        Self {
            requested_colors,
            used: HashSet::new(),
            usage_count: HashMap::new(),
        }
    }

    /// The colors the caller asked for, in order.
    pub fn requested_colors(&self) -> &[String] {
        &self.requested_colors
    }

    /// Draw the next color, `None` only when nothing was requested.
    pub fn next_color<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        let unused: Vec<&String> = self
            .requested_colors
            .iter()
            .filter(|color| !self.used.contains(*color))
            .collect();

        let chosen = match unused.choose(rng) {
            Some(color) => (*color).clone(),
            None => self.requested_colors.choose(rng)?.clone(),
        };

        self.used.insert(chosen.clone());
        *self.usage_count.entry(chosen.clone()).or_insert(0) += 1;
        Some(chosen)
    }

    /// True once every requested color has been drawn at least once.
    pub fn all_colors_used(&self) -> bool {
        self.requested_colors
            .iter()
            .all(|color| self.used.contains(color))
    }

    /// How often each color was drawn, in request order, skipping unused ones.
    pub fn usage_summary(&self) -> Vec<(String, usize)> {
        let mut seen = HashSet::new();
        self.requested_colors
            .iter()
            .filter(|color| seen.insert(color.as_str()))
            .filter_map(|color| {
                self.usage_count
                    .get(color)
                    .map(|count| (color.clone(), *count))
            })
            .collect()
    }
}

/// The color strategy for a batch.
#[derive(Clone, Debug)]
pub enum ColorSource {
    /// Caller supplied colors with a coverage guarantee
    Ledger(ColorUsageLedger),
    /// Caller supplied colors, picked uniformly
    Uniform(Vec<String>),
    /// No colors supplied, derive one from the color harmony model
    Harmonic {
        /// Fixed ceramic type, random per prompt when unset
        ceramic_type: Option<CeramicType>,
    },
}

impl ColorSource {
    /// Pick the strategy for a set of caller supplied colors.
    pub fn new(colors: Vec<String>, coverage: bool, ceramic_type: Option<CeramicType>) -> Self {
        if colors.is_empty() {
            ColorSource::Harmonic { ceramic_type }
        } else if coverage {
            ColorSource::Ledger(ColorUsageLedger::new(colors))
        } else {
            ColorSource::Uniform(colors)
        }
    }

    /// True when colors came from the caller rather than the harmony model.
    pub fn is_caller_supplied(&self) -> bool {
        !matches!(self, ColorSource::Harmonic { .. })
    }

    /// The smallest batch that covers every requested color.
    pub fn minimum_batch_size(&self) -> usize {
        match self {
            ColorSource::Ledger(ledger) => ledger.requested_colors().len(),
            _ => 0,
        }
    }

    /// The usage ledger, when this source keeps one.
    pub fn ledger(&self) -> Option<&ColorUsageLedger> {
        match self {
            ColorSource::Ledger(ledger) => Some(ledger),
            _ => None,
        }
    }

    /// The dominant color for the next prompt.
    pub fn next_color<R: Rng + ?Sized>(&mut self, families: &ColorFamilies, rng: &mut R) -> String {
        let picked = match self {
            ColorSource::Ledger(ledger) => ledger.next_color(rng),
            ColorSource::Uniform(colors) => colors.choose(rng).cloned(),
            ColorSource::Harmonic { .. } => None,
        };
        if let Some(color) = picked {
            return color;
        }

        let ceramic_type = match self {
            ColorSource::Harmonic {
                ceramic_type: Some(ceramic_type),
            } => *ceramic_type,
            _ => CeramicType::random(rng),
        };
        let (palette, ceramic_type) = families.random_palette(Some(ceramic_type), rng);
        debug!(
            "Automatic palette for {ceramic_type}: {:?} weights {:?}",
            palette.colors, palette.weights
        );
        palette.primary().unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn colors(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn ledger_covers_every_color_before_repeating() {
        let requested = colors(&["red", "blue", "green", "amber"]);
        let mut ledger = ColorUsageLedger::new(requested.clone());
        let mut rng = StdRng::seed_from_u64(6);

        let mut drawn = HashSet::new();
        for _ in 0..requested.len() {
            drawn.insert(ledger.next_color(&mut rng).expect("color"));
        }
        assert_eq!(drawn.len(), requested.len());
        assert!(ledger.all_colors_used());

        let next = ledger.next_color(&mut rng).expect("color");
        assert!(requested.contains(&next));
    }

    #[test]
    fn ledger_counts_usage() {
        let mut ledger = ColorUsageLedger::new(colors(&["red", "blue"]));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..6 {
            ledger.next_color(&mut rng);
        }
        let summary = ledger.usage_summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.iter().map(|(_, count)| count).sum::<usize>(), 6);
        assert_eq!(summary[0].0, "red");
        assert_eq!(summary[1].0, "blue");
    }

    #[test]
    fn empty_ledger_yields_nothing() {
        let mut ledger = ColorUsageLedger::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(ledger.all_colors_used());
        assert_eq!(ledger.next_color(&mut rng), None);
    }

    #[test]
    fn source_selection() {
        assert!(matches!(
            ColorSource::new(Vec::new(), true, None),
            ColorSource::Harmonic { ceramic_type: None }
        ));
        let ledger = ColorSource::new(colors(&["red", "blue"]), true, None);
        assert_eq!(ledger.minimum_batch_size(), 2);
        assert!(ledger.is_caller_supplied());
        let uniform = ColorSource::new(colors(&["red", "blue"]), false, None);
        assert_eq!(uniform.minimum_batch_size(), 0);
        assert!(uniform.ledger().is_none());
    }

    #[test]
    fn harmonic_source_draws_from_the_family() {
        let families = ColorFamilies::bundled().expect("bundled color families");
        let mut source = ColorSource::Harmonic {
            ceramic_type: Some(CeramicType::Stellar),
        };
        let stellar: Vec<String> = families
            .family("stellar")
            .subcategories
            .iter()
            .flat_map(|sub| sub.colors.clone())
            .collect();
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..25 {
            let color = source.next_color(&families, &mut rng);
            assert!(stellar.contains(&color), "{color}");
        }
    }
}
