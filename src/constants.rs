//! Shared constants/defaults for things
//!

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// The default place we put generated images
pub static OUTPUT_DIR: LazyLock<PathBuf> = LazyLock::new(|| PathBuf::from("alien_ceramics_batch"));

/// The default place batch journals are written
pub static LOG_DIR: LazyLock<PathBuf> = LazyLock::new(|| PathBuf::from("logs"));

/// Environment variable holding the Stability AI API key
pub const API_KEY_ENV: &str = "STABILITY_API_KEY";

/// Default Stability AI REST host
pub const DEFAULT_API_HOST: &str = "https://api.stability.ai";

/// Default generation engine
pub const DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

/// Default number of images per batch
pub const DEFAULT_NUM_IMAGES: usize = 5;

/// Per-item seeds are drawn from `0..SEED_UPPER_BOUND`
pub const SEED_UPPER_BOUND: u32 = 1_000_000;

/// Default diffusion steps
pub const DEFAULT_STEPS: u32 = 50;

/// Default classifier-free guidance scale
pub const DEFAULT_CFG_SCALE: f32 = 7.5;

/// Default number of samples per request
pub const DEFAULT_SAMPLES: u32 = 1;

/// Pause between successful items, keeps us under the upstream rate limit
pub const SUCCESS_DELAY: Duration = Duration::from_millis(500);

/// First backoff after a rate limit signal
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Timeout for a single request to the image API
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Minimum length of a plausible API key
pub const API_KEY_MIN_LENGTH: usize = 41;

/// Prefix every Stability AI key carries
pub const API_KEY_PREFIX: &str = "sk-";
