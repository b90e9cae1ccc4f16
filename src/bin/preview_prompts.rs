//! Compose prompts and palettes offline, without calling the image API.
use std::path::PathBuf;

use alien_ceramics::aspect_ratio::AspectRatio;
use alien_ceramics::color_source::ColorSource;
use alien_ceramics::palette::{CeramicType, ColorFamilies};
use alien_ceramics::prompt::{PromptEngine, PromptProfile};
use alien_ceramics::vocabulary::VocabularyBank;
use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Preview what a batch would ask for.
///
///   preview_prompts -n 3 --type stellar
#[derive(Parser, Debug)]
#[command(name = "preview_prompts")]
struct Args {
    /// Colors to feature, automatic palettes when empty
    colors: Vec<String>,

    /// How many prompts to compose
    #[arg(long, short = 'n', default_value_t = 3)]
    count: usize,

    /// Ceramic type for automatic palettes
    #[arg(long = "type", value_enum)]
    ceramic_type: Option<CeramicType>,

    /// Prompt layout
    #[arg(long, value_enum, default_value_t = PromptProfile::Museum)]
    profile: PromptProfile,

    /// Seed the RNG for a repeatable preview
    #[arg(long)]
    seed: Option<u64>,

    /// Phrase banks to use instead of the bundled ones
    #[arg(long)]
    vocabulary: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let vocabulary = match &args.vocabulary {
        Some(path) => VocabularyBank::from_path(path)
            .with_context(|| format!("Failed to load vocabulary from {}", path.display()))?,
        None => VocabularyBank::bundled()?,
    };
    let families = ColorFamilies::bundled()?;
    let engine = PromptEngine::new(vocabulary, families, args.profile);
    let mut source = ColorSource::new(args.colors.clone(), true, args.ceramic_type);
    let mut rng = StdRng::seed_from_u64(args.seed.unwrap_or_else(rand::random));

    let count = args.count.max(source.minimum_batch_size());
    for index in 0..count {
        let ratio = AspectRatio::random(&mut rng);
        let prompt = engine.compose(ratio, &mut source, &mut rng);
        println!("#{} [{ratio}, {}x{}]", index + 1, ratio.width(), ratio.height());
        if let Some(classification) = &prompt.classification {
            match &classification.scale {
                Some(scale) => println!("Classification: {} / {scale}", classification.category),
                None => println!("Classification: {}", classification.category),
            }
        }
        println!("Color: {}", prompt.color);
        println!("{}\n", prompt.text);
    }

    println!("Palette preview:");
    let types = match args.ceramic_type {
        Some(ceramic_type) => vec![ceramic_type],
        None => CeramicType::ALL.to_vec(),
    };
    for ceramic_type in types {
        let (palette, _) = engine.families().random_palette(Some(ceramic_type), &mut rng);
        let swatches: Vec<String> = palette
            .colors
            .iter()
            .zip(&palette.weights)
            .map(|(color, weight)| format!("{color} ({:.0}%)", weight * 100.0))
            .collect();
        println!("{:>12}: {}", ceramic_type.tag(), swatches.join(", "));
    }
    Ok(())
}
