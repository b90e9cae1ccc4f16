//! Batch generation: compose, submit, classify failures, persist.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Serialize, Serializer};

use crate::aspect_ratio::AspectRatio;
use crate::client::{Artifact, GenerationRequest, ImageGenerationClient, Sampler};
use crate::color_source::ColorSource;
use crate::constants::{
    DEFAULT_CFG_SCALE, DEFAULT_SAMPLES, DEFAULT_STEPS, RATE_LIMIT_BACKOFF, SEED_UPPER_BOUND,
    SUCCESS_DELAY,
};
use crate::error::{CeramicsError, GenerationError};
use crate::journal::Journal;
use crate::prompt::{ComposedPrompt, PromptEngine};

/// Fixed sampling configuration sent with every request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
    /// Diffusion steps
    pub steps: u32,
    /// Guidance scale
    pub cfg_scale: f32,
    /// Images per prompt
    pub samples: u32,
    /// Sampler
    pub sampler: Sampler,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            cfg_scale: DEFAULT_CFG_SCALE,
            samples: DEFAULT_SAMPLES,
            sampler: Sampler::default(),
        }
    }
}

/// How to wait out rate limiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Wait after the first rate limit signal
    pub backoff: Duration,
    /// Upper bound for the doubling backoff
    pub max_backoff: Duration,
    /// Give up on the item after this many consecutive retries, never when `None`
    pub max_retries: Option<u32>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            backoff: RATE_LIMIT_BACKOFF,
            max_backoff: RATE_LIMIT_BACKOFF,
            max_retries: None,
        }
    }
}

impl RateLimitPolicy {
    /// Wait before retry number `attempt` (1-based): doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff.max(self.backoff))
    }

    /// True once `attempt` retries have used up the budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_retries.is_some_and(|max| attempt > max)
    }
}

/// Tunables for a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchSettings {
    /// Request parameters
    pub sampling: SamplingParams,
    /// Rate limit handling
    pub rate_limit: RateLimitPolicy,
    /// Pause after each saved item
    pub success_delay: Duration,
    /// Clamp requested width and height to this, on top of any client limit
    pub max_dimension: Option<u32>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            sampling: SamplingParams::default(),
            rate_limit: RateLimitPolicy::default(),
            success_delay: SUCCESS_DELAY,
            max_dimension: None,
        }
    }
}

/// One saved artifact.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationResult {
    /// Where the image was written
    pub filename: PathBuf,
    /// The prompt it was generated from
    pub prompt: String,
    /// Aspect ratio used
    pub aspect_ratio: AspectRatio,
    /// Requested dimensions, `WxH`
    pub dimensions: String,
    /// Seed used for the request
    pub seed: Option<u64>,
    /// Wall clock time of the request
    #[serde(serialize_with = "serialize_secs")]
    pub generation_time: Duration,
    /// Dominant color, when it came from the caller or the palette
    pub color: Option<String>,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Terminal state of one batch item.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ItemOutcome {
    Saved,
    Skipped,
    Aborted,
}

/// Swap anything outside `[A-Za-z0-9-]` for `_` so a color can go in a filename.
pub fn filename_tag(color: &str) -> String {
    color
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// `ceramic_<index>[_<color>]_<ratio>_<artifact>.png`
pub fn artifact_filename(
    index: usize,
    color_tag: Option<&str>,
    aspect_ratio: AspectRatio,
    artifact_index: usize,
) -> String {
    let color = color_tag
        .map(|color| format!("_{}", filename_tag(color)))
        .unwrap_or_default();
    format!(
        "ceramic_{index}{color}_{}_{artifact_index}.png",
        aspect_ratio.file_segment()
    )
}

/// Runs batches of image generations against a client.
pub struct Generator<C> {
    client: C,
    engine: PromptEngine,
    color_source: ColorSource,
    settings: BatchSettings,
    journal: Journal,
    rng: StdRng,
}

impl<C: ImageGenerationClient> Generator<C> {
    /// Build a generator; the journal stays open until the end of each batch.
    pub fn new(
        client: C,
        engine: PromptEngine,
        color_source: ColorSource,
        settings: BatchSettings,
        journal: Journal,
    ) -> Self {
        Self::with_rng(
            client,
            engine,
            color_source,
            settings,
            journal,
            StdRng::seed_from_u64(rand::random()),
        )
    }

    /// Like [`Generator::new`] with a caller provided RNG, for reproducible runs.
    pub fn with_rng(
        client: C,
        engine: PromptEngine,
        color_source: ColorSource,
        settings: BatchSettings,
        mut journal: Journal,
        rng: StdRng,
    ) -> Self {
        journal.info("Initializing Alien Ceramics Generator");
        journal.info(format!("Prompt profile: {:?}", engine.profile()));
        match &color_source {
            ColorSource::Ledger(ledger) => journal.info(format!(
                "Color manager initialized with {} colors",
                ledger.requested_colors().len()
            )),
            ColorSource::Uniform(colors) => {
                journal.info(format!("Using {} supplied colors", colors.len()))
            }
            ColorSource::Harmonic { ceramic_type } => journal.info(format!(
                "Using automatic color selection ({})",
                ceramic_type.map_or("random type".to_string(), |t| t.to_string())
            )),
        }
        Self {
            client,
            engine,
            color_source,
            settings,
            journal,
            rng,
        }
    }

    /// The color strategy, including its usage ledger.
    pub fn color_source(&self) -> &ColorSource {
        &self.color_source
    }

    /// The journal entries are written to.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The client requests go to.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The number of items a batch of `count` will actually run.
    pub fn effective_count(&self, count: usize) -> usize {
        count.max(self.color_source.minimum_batch_size())
    }

    fn resolve_seed(&mut self, seed: Option<u32>) -> u32 {
        seed.unwrap_or_else(|| self.rng.random_range(0..SEED_UPPER_BOUND))
    }

    fn max_dimension(&self) -> Option<u32> {
        match (self.settings.max_dimension, self.client.max_dimension()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Generate `count` items into `output_dir`.
    ///
    /// Rate limited items are retried in place, failed items are dropped, and
    /// an authentication failure ends the batch with what was saved so far.
    pub async fn generate_batch(
        &mut self,
        count: usize,
        output_dir: &Path,
        seed: Option<u32>,
    ) -> Result<Vec<GenerationResult>, CeramicsError> {
        self.journal
            .info(format!("Starting batch generation of {count} images"));

        let total = self.effective_count(count);
        if total > count {
            self.journal.warn(format!(
                "Increasing number of images from {count} to {total} to ensure all colors are used"
            ));
        }

        fs::create_dir_all(output_dir)?;
        self.journal
            .info(format!("Output directory: {}", output_dir.display()));

        let mut results = Vec::new();
        let mut skipped = 0usize;
        for index in 0..total {
            match self
                .generate_item(index, total, output_dir, seed, &mut results)
                .await
            {
                ItemOutcome::Saved => {}
                ItemOutcome::Skipped => skipped += 1,
                ItemOutcome::Aborted => {
                    self.journal.error(format!(
                        "Aborting batch after item {}, {} image(s) saved",
                        index + 1,
                        results.len()
                    ));
                    break;
                }
            }
        }

        self.journal.info(format!(
            "Batch finished: {} image(s) saved, {skipped} item(s) skipped",
            results.len()
        ));
        if let Some(ledger) = self.color_source.ledger() {
            for (color, times) in ledger.usage_summary() {
                self.journal.info(format!("Color usage: {color}: {times} times"));
            }
        }
        self.journal.finish();
        Ok(results)
    }

    async fn generate_item(
        &mut self,
        index: usize,
        total: usize,
        output_dir: &Path,
        seed: Option<u32>,
        results: &mut Vec<GenerationResult>,
    ) -> ItemOutcome {
        // PENDING -> COMPOSED
        let aspect_ratio = AspectRatio::random(&mut self.rng);
        let composed = self
            .engine
            .compose(aspect_ratio, &mut self.color_source, &mut self.rng);
        let seed = self.resolve_seed(seed);
        let (width, height) = aspect_ratio.clamped_dimensions(self.max_dimension());
        let request = GenerationRequest {
            prompt: composed.text.clone(),
            seed,
            steps: self.settings.sampling.steps,
            cfg_scale: self.settings.sampling.cfg_scale,
            width,
            height,
            samples: self.settings.sampling.samples,
            sampler: self.settings.sampling.sampler,
        };
        self.log_composed(index, total, aspect_ratio, &composed, &request);
        self.journal.debug(format!(
            "Request: seed={} steps={} cfg_scale={} samples={} sampler={}",
            request.seed, request.steps, request.cfg_scale, request.samples, request.sampler
        ));

        // COMPOSED -> SUBMITTED, retrying in place while rate limited
        let mut retries = 0u32;
        loop {
            let started = Instant::now();
            let outcome = self.client.generate(&request).await;
            match outcome {
                Ok(artifacts) => {
                    let elapsed = started.elapsed();
                    let saved = self.save_artifacts(
                        index,
                        output_dir,
                        aspect_ratio,
                        &composed,
                        &request,
                        artifacts,
                        elapsed,
                        results,
                    );
                    if saved == ItemOutcome::Saved {
                        tokio::time::sleep(self.settings.success_delay).await;
                    }
                    return saved;
                }
                Err(err) if err.is_retryable() => {
                    retries += 1;
                    let policy = self.settings.rate_limit;
                    if policy.exhausted(retries) {
                        self.journal.error(format!(
                            "Error generating image {}: still rate limited after {} retries ({err})",
                            index + 1,
                            retries - 1
                        ));
                        return ItemOutcome::Skipped;
                    }
                    let delay = policy.delay_for(retries);
                    self.journal.warn(format!(
                        "Rate limit reached. Waiting {:.1}s before retrying image {}...",
                        delay.as_secs_f64(),
                        index + 1
                    ));
                    tokio::time::sleep(delay).await;
                }
                Err(GenerationError::Authentication(message)) => {
                    self.journal
                        .error(format!("Authentication failed: {message}"));
                    return ItemOutcome::Aborted;
                }
                Err(err) => {
                    self.journal
                        .error(format!("Error generating image {}: {err}", index + 1));
                    return ItemOutcome::Skipped;
                }
            }
        }
    }

    fn log_composed(
        &mut self,
        index: usize,
        total: usize,
        aspect_ratio: AspectRatio,
        composed: &ComposedPrompt,
        request: &GenerationRequest,
    ) {
        self.journal
            .info(format!("Generating image {}/{total}", index + 1));
        self.journal
            .info(format!("Aspect Ratio: {}", aspect_ratio.name()));
        self.journal
            .info(format!("Primary Color: {}", composed.color));
        if let Some(classification) = &composed.classification {
            self.journal.info(format!(
                "Cosmic Classification: {}",
                classification.category
            ));
            if let Some(scale) = &classification.scale {
                self.journal.info(format!("Scale Category: {scale}"));
            }
        }
        self.journal.info(format!(
            "Dimensions: {}x{}",
            request.width, request.height
        ));
        self.journal.info(format!("Prompt: {}", composed.text));
    }

    // SUBMITTED -> SAVED, or SKIPPED when an artifact cannot be written
    #[allow(clippy::too_many_arguments)]
    fn save_artifacts(
        &mut self,
        index: usize,
        output_dir: &Path,
        aspect_ratio: AspectRatio,
        composed: &ComposedPrompt,
        request: &GenerationRequest,
        artifacts: Vec<Artifact>,
        elapsed: Duration,
        results: &mut Vec<GenerationResult>,
    ) -> ItemOutcome {
        if artifacts.is_empty() {
            self.journal.error(format!(
                "Error generating image {}: no artifacts returned",
                index + 1
            ));
            return ItemOutcome::Skipped;
        }

        let color_tag = self
            .color_source
            .is_caller_supplied()
            .then_some(composed.color.as_str());

        for (artifact_index, artifact) in artifacts.into_iter().enumerate() {
            let filename =
                output_dir.join(artifact_filename(index, color_tag, aspect_ratio, artifact_index));
            if let Err(err) = fs::write(&filename, &artifact.binary) {
                self.journal.error(format!(
                    "Unexpected error saving {}: {err}",
                    filename.display()
                ));
                return ItemOutcome::Skipped;
            }

            self.journal
                .info(format!("Saved image to: {}", filename.display()));
            self.journal.info(format!(
                "Generation time: {:.2}s",
                elapsed.as_secs_f64()
            ));
            results.push(GenerationResult {
                filename,
                prompt: composed.text.clone(),
                aspect_ratio,
                dimensions: format!("{}x{}", request.width, request.height),
                seed: Some(artifact.seed.unwrap_or(u64::from(request.seed))),
                generation_time: elapsed,
                color: Some(composed.color.clone()),
            });
        }

        self.journal
            .info(format!("Successfully generated image {}", index + 1));
        ItemOutcome::Saved
    }
}
