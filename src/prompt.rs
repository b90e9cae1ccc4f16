//! Prompt composition: fixed slot order, random fill.

use clap::ValueEnum;
use rand::Rng;

use crate::aspect_ratio::AspectRatio;
use crate::color_source::ColorSource;
use crate::palette::ColorFamilies;
use crate::vocabulary::{Classification, VocabularyAxis, VocabularyBank};

/// Framing prefixed to the classification description.
pub const ARTIFACT_FRAMING: &str = "Advanced alien ceramic artifact";

/// Quality boilerplate closing every museum prompt.
pub const MUSEUM_QUALITY_SUFFIX: &str = "professional museum photography, sharp focus, high detail, proper exposure, full framing, uniform lighting, clear edges, 8k, highly detailed, professional color accuracy";

/// Quality boilerplate closing every product prompt.
pub const PRODUCT_QUALITY_SUFFIX: &str =
    "professional product photography, studio lighting, 8k, highly detailed";

/// Which prompt layout to compose.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum PromptProfile {
    /// Classification led, museum documentation style (fourteen slots)
    #[default]
    Museum,
    /// Short product shot layout (seven slots)
    Product,
}

impl PromptProfile {
    /// The literal suffix this profile ends with.
    pub fn quality_suffix(self) -> &'static str {
        match self {
            Self::Museum => MUSEUM_QUALITY_SUFFIX,
            Self::Product => PRODUCT_QUALITY_SUFFIX,
        }
    }
}

/// A composed prompt and what went into it.
#[derive(Clone, Debug)]
pub struct ComposedPrompt {
    /// The prompt text sent to the image API
    pub text: String,
    /// Dominant color named in the prompt
    pub color: String,
    /// Classification drawn, museum profile only
    pub classification: Option<Classification>,
}

/// Builds prompts from the vocabulary bank and a color source.
#[derive(Clone, Debug)]
pub struct PromptEngine {
    vocabulary: VocabularyBank,
    families: ColorFamilies,
    profile: PromptProfile,
}

impl PromptEngine {
    /// Create an engine over loaded tables.
    pub fn new(vocabulary: VocabularyBank, families: ColorFamilies, profile: PromptProfile) -> Self {
        Self {
            vocabulary,
            families,
            profile,
        }
    }

    /// The color family table.
    pub fn families(&self) -> &ColorFamilies {
        &self.families
    }

    /// The phrase banks.
    pub fn vocabulary(&self) -> &VocabularyBank {
        &self.vocabulary
    }

    /// The configured layout.
    pub fn profile(&self) -> PromptProfile {
        self.profile
    }

    /// Compose one prompt for the given ratio.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        aspect_ratio: AspectRatio,
        color_source: &mut ColorSource,
        rng: &mut R,
    ) -> ComposedPrompt {
        match self.profile {
            PromptProfile::Museum => self.compose_museum(aspect_ratio, color_source, rng),
            PromptProfile::Product => self.compose_product(aspect_ratio, color_source, rng),
        }
    }

    fn compose_museum<R: Rng + ?Sized>(
        &self,
        aspect_ratio: AspectRatio,
        color_source: &mut ColorSource,
        rng: &mut R,
    ) -> ComposedPrompt {
        let classification = self.vocabulary.draw_classification(rng);
        let color = color_source.next_color(&self.families, rng);
        let v = &self.vocabulary;

        // The second base description is independent of the classification one.
        let components = [
            format!("{ARTIFACT_FRAMING}: {}", classification.description),
            format!("predominantly {color}"),
            v.draw(VocabularyAxis::TechnologicalAspects, rng).to_string(),
            v.draw(VocabularyAxis::AlienCivilizations, rng).to_string(),
            v.draw(VocabularyAxis::ScientificPrinciples, rng).to_string(),
            v.draw(VocabularyAxis::CosmicPurposes, rng).to_string(),
            v.draw(VocabularyAxis::Lighting, rng).to_string(),
            v.draw(VocabularyAxis::CameraSettings, rng).to_string(),
            v.draw(VocabularyAxis::CompositionSettings, rng).to_string(),
            aspect_ratio.composition_hint().to_string(),
            v.draw(VocabularyAxis::BaseDescriptions, rng).to_string(),
            v.draw(VocabularyAxis::Materials, rng).to_string(),
            v.draw(VocabularyAxis::Styles, rng).to_string(),
            PromptProfile::Museum.quality_suffix().to_string(),
        ];

        ComposedPrompt {
            text: components.join(", "),
            color,
            classification: Some(classification),
        }
    }

    fn compose_product<R: Rng + ?Sized>(
        &self,
        aspect_ratio: AspectRatio,
        color_source: &mut ColorSource,
        rng: &mut R,
    ) -> ComposedPrompt {
        let color = color_source.next_color(&self.families, rng);
        let v = &self.vocabulary;

        let components = [
            v.draw(VocabularyAxis::BaseDescriptions, rng).to_string(),
            format!("predominantly {color}"),
            v.draw(VocabularyAxis::Materials, rng).to_string(),
            v.draw(VocabularyAxis::Styles, rng).to_string(),
            v.draw(VocabularyAxis::Lighting, rng).to_string(),
            aspect_ratio.composition_hint().to_string(),
            PromptProfile::Product.quality_suffix().to_string(),
        ];

        ComposedPrompt {
            text: components.join(", "),
            color,
            classification: None,
        }
    }
}
