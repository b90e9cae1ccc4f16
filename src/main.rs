use std::env;
use std::fs;
use std::path::Path;

use alien_ceramics::cli::CliOptions;
use alien_ceramics::client::StabilityClient;
use alien_ceramics::color_source::ColorSource;
use alien_ceramics::config::{load_credentials, setup_logging, validate_api_key};
use alien_ceramics::constants::API_KEY_ENV;
use alien_ceramics::generator::{GenerationResult, Generator};
use alien_ceramics::journal::Journal;
use alien_ceramics::palette::ColorFamilies;
use alien_ceramics::prompt::PromptEngine;
use alien_ceramics::vocabulary::VocabularyBank;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{info, warn};

fn print_summary(results: &[GenerationResult], color_usage: Option<Vec<(String, usize)>>) {
    println!("\nGeneration Summary:");
    for result in results {
        println!("\nImage: {}", result.filename.display());
        println!("Aspect Ratio: {}", result.aspect_ratio);
        println!("Dimensions: {}", result.dimensions);
        if let Some(color) = &result.color {
            println!("Color: {color}");
        }
        if let Some(seed) = result.seed {
            println!("Seed: {seed}");
        }
        println!("Prompt: {}", result.prompt);
        println!(
            "Generation Time: {:.2} seconds",
            result.generation_time.as_secs_f64()
        );
    }

    if let Some(usage) = color_usage {
        println!("\nColor Usage Summary:");
        for (color, times) in usage {
            println!("{color}: {times} times");
        }
    }
    println!("\nTotal images generated: {}", results.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliOptions::parse();
    setup_logging(cli.debug)?;

    if cli.require_colors && cli.colors.is_empty() {
        return Err(anyhow!(
            "No colors given. Pass one or more colors, eg: alien_ceramics red blue \"deep green\""
        ));
    }

    let api_key = match cli.api_key.clone() {
        Some(key) => key,
        None => {
            load_credentials(Path::new(".env"))?;
            env::var(API_KEY_ENV)
                .with_context(|| format!("{API_KEY_ENV} not found in environment or .env"))?
        }
    };
    if cli.skip_key_check {
        warn!("Skipping API key format check");
    } else {
        validate_api_key(&api_key)?;
    }

    let vocabulary = match &cli.vocabulary {
        Some(path) => VocabularyBank::from_path(path)
            .with_context(|| format!("Failed to load vocabulary from {}", path.display()))?,
        None => VocabularyBank::bundled()?,
    };
    let families = ColorFamilies::bundled()?;
    let engine = PromptEngine::new(vocabulary, families, cli.profile);

    let client = StabilityClient::new(&api_key, &cli.api_host, &cli.engine)?;
    info!("Using engine {} at {}", client.engine(), cli.api_host);
    if cli.skip_connection_check {
        warn!("Skipping API connection check");
    } else {
        info!("Testing API connection...");
        client.verify().await?;
        info!("API connection successful");
    }

    let color_source = ColorSource::new(cli.colors.clone(), !cli.no_coverage, cli.ceramic_type);
    let journal = Journal::open(&cli.log_dir)?;
    if let Some(path) = journal.path() {
        info!("Logging to {}", path.display());
    }

    let mut generator = Generator::new(
        client,
        engine,
        color_source,
        cli.batch_settings(),
        journal,
    );
    let results = generator
        .generate_batch(cli.num_images, &cli.output_dir, cli.seed)
        .await?;

    print_summary(
        &results,
        generator
            .color_source()
            .ledger()
            .map(|ledger| ledger.usage_summary()),
    );

    if let Some(path) = &cli.summary_json {
        let body = serde_json::to_string_pretty(&results)?;
        fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote summary to {}", path.display());
    }

    Ok(())
}
