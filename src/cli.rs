//! CLI parser
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::client::Sampler;
use crate::constants::{
    DEFAULT_API_HOST, DEFAULT_CFG_SCALE, DEFAULT_ENGINE, DEFAULT_NUM_IMAGES, DEFAULT_SAMPLES,
    DEFAULT_STEPS, LOG_DIR, OUTPUT_DIR, RATE_LIMIT_BACKOFF,
};
use crate::generator::{BatchSettings, RateLimitPolicy, SamplingParams};
use crate::palette::CeramicType;
use crate::prompt::PromptProfile;

#[derive(Parser, Debug)]
#[command(name = "alien_ceramics")]
/// Generate batches of alien ceramic artifact images with Stability AI.
pub struct CliOptions {
    /// Colors to feature, eg `red "deep blue"`. Automatic palettes when empty.
    pub colors: Vec<String>,

    #[clap(long, short = 'n', default_value_t = DEFAULT_NUM_IMAGES)]
    /// Number of images to generate, raised to cover every given color
    pub num_images: usize,

    #[clap(long, short, default_value_os_t = OUTPUT_DIR.clone(), env = "ALIEN_CERAMICS_OUTPUT_DIR")]
    /// Output directory, defaults to `alien_ceramics_batch`.
    /// Env: ALIEN_CERAMICS_OUTPUT_DIR
    pub output_dir: PathBuf,

    #[clap(long = "type", value_enum)]
    /// Ceramic type for automatic palettes, random per image when unset
    pub ceramic_type: Option<CeramicType>,

    #[clap(long)]
    /// Use this seed for every image instead of a random one each
    pub seed: Option<u32>,

    #[clap(long, value_enum, default_value_t = PromptProfile::Museum)]
    /// Prompt layout
    pub profile: PromptProfile,

    #[clap(long)]
    /// Refuse to run without colors
    pub require_colors: bool,

    #[clap(long)]
    /// Pick colors uniformly instead of guaranteeing each is used
    pub no_coverage: bool,

    #[clap(long)]
    /// Clamp width and height to this, eg 512 for older API tiers
    pub max_dimension: Option<u32>,

    #[clap(long, default_value_t = DEFAULT_STEPS)]
    /// Diffusion steps
    pub steps: u32,

    #[clap(long, default_value_t = DEFAULT_CFG_SCALE)]
    /// Guidance scale
    pub cfg_scale: f32,

    #[clap(long, default_value_t = DEFAULT_SAMPLES)]
    /// Images per prompt
    pub samples: u32,

    #[clap(long, value_enum, default_value_t = Sampler::default())]
    /// Sampler
    pub sampler: Sampler,

    #[clap(long, default_value = DEFAULT_ENGINE, env = "STABILITY_ENGINE")]
    /// Engine id. Env: STABILITY_ENGINE
    pub engine: String,

    #[clap(long, default_value = DEFAULT_API_HOST, env = "STABILITY_API_HOST")]
    /// API host. Env: STABILITY_API_HOST
    pub api_host: String,

    #[clap(long, env = "STABILITY_API_KEY", hide_env_values = true)]
    /// Stability AI API key, read from `.env` when not set.
    /// Env: STABILITY_API_KEY
    pub api_key: Option<String>,

    #[clap(long, default_value_t = RATE_LIMIT_BACKOFF.as_secs())]
    /// Seconds to wait after a rate limit response
    pub rate_limit_backoff_secs: u64,

    #[clap(long)]
    /// Cap for the doubling backoff, no doubling when unset
    pub max_backoff_secs: Option<u64>,

    #[clap(long)]
    /// Skip an image after this many rate limited retries, never when unset
    pub max_rate_limit_retries: Option<u32>,

    #[clap(long, default_value_os_t = LOG_DIR.clone(), env = "ALIEN_CERAMICS_LOG_DIR")]
    /// Where batch logs go, defaults to `logs`.
    /// Env: ALIEN_CERAMICS_LOG_DIR
    pub log_dir: PathBuf,

    #[clap(long)]
    /// Load phrase banks from this JSON file instead of the bundled ones
    pub vocabulary: Option<PathBuf>,

    #[clap(long)]
    /// Write the results as JSON to this path
    pub summary_json: Option<PathBuf>,

    #[clap(long)]
    /// Don't call the account endpoint before starting
    pub skip_connection_check: bool,

    #[clap(long)]
    /// Don't check the API key format
    pub skip_key_check: bool,

    #[clap(long, help = "Enable debug logging", env = "ALIEN_CERAMICS_DEBUG")]
    /// Enable debug logging. Env: ALIEN_CERAMICS_DEBUG
    pub debug: bool,
}

impl CliOptions {
    /// Batch tunables from the flags.
    pub fn batch_settings(&self) -> BatchSettings {
        let backoff = Duration::from_secs(self.rate_limit_backoff_secs);
        BatchSettings {
            sampling: SamplingParams {
                steps: self.steps,
                cfg_scale: self.cfg_scale,
                samples: self.samples,
                sampler: self.sampler,
            },
            rate_limit: RateLimitPolicy {
                backoff,
                max_backoff: self
                    .max_backoff_secs
                    .map_or(backoff, Duration::from_secs),
                max_retries: self.max_rate_limit_retries,
            },
            max_dimension: self.max_dimension,
            ..BatchSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CliOptions::parse_from(["alien_ceramics"]);
        assert!(cli.colors.is_empty());
        assert_eq!(cli.num_images, DEFAULT_NUM_IMAGES);
        assert_eq!(cli.profile, PromptProfile::Museum);
        assert_eq!(cli.steps, DEFAULT_STEPS);
        let settings = cli.batch_settings();
        assert_eq!(settings.rate_limit, RateLimitPolicy::default());
        assert_eq!(settings.max_dimension, None);
    }

    #[test]
    fn colors_and_flags() {
        let cli = CliOptions::parse_from([
            "alien_ceramics",
            "red",
            "deep blue",
            "-n",
            "3",
            "--type",
            "quantum",
            "--profile",
            "product",
            "--max-dimension",
            "512",
            "--max-backoff-secs",
            "60",
            "--max-rate-limit-retries",
            "4",
        ]);
        assert_eq!(cli.colors, vec!["red".to_string(), "deep blue".to_string()]);
        assert_eq!(cli.num_images, 3);
        assert_eq!(cli.ceramic_type, Some(CeramicType::Quantum));
        assert_eq!(cli.profile, PromptProfile::Product);
        let settings = cli.batch_settings();
        assert_eq!(settings.max_dimension, Some(512));
        assert_eq!(settings.rate_limit.max_backoff, Duration::from_secs(60));
        assert_eq!(settings.rate_limit.max_retries, Some(4));
    }
}
