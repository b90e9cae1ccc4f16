//! Image generation clients.
//!
//! The generator only talks to the [`ImageGenerationClient`] trait; the
//! Stability AI REST client lives in [`stability`].

use std::fmt;
use std::future::Future;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::GenerationError;

pub mod stability;

pub use stability::StabilityClient;

/// Diffusion samplers the upstream service accepts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum, Serialize)]
pub enum Sampler {
    /// DPM++ 2M, Karras style
    #[default]
    #[serde(rename = "K_DPMPP_2M")]
    KDpmpp2m,
    /// DPM++ 2S ancestral
    #[serde(rename = "K_DPMPP_2S_ANCESTRAL")]
    KDpmpp2sAncestral,
    /// Euler
    #[serde(rename = "K_EULER")]
    KEuler,
    /// Euler ancestral
    #[serde(rename = "K_EULER_ANCESTRAL")]
    KEulerAncestral,
    /// Heun
    #[serde(rename = "K_HEUN")]
    KHeun,
    /// DDIM
    #[serde(rename = "DDIM")]
    Ddim,
}

impl fmt::Display for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KDpmpp2m => "K_DPMPP_2M",
            Self::KDpmpp2sAncestral => "K_DPMPP_2S_ANCESTRAL",
            Self::KEuler => "K_EULER",
            Self::KEulerAncestral => "K_EULER_ANCESTRAL",
            Self::KHeun => "K_HEUN",
            Self::Ddim => "DDIM",
        };
        f.write_str(name)
    }
}

/// One text-to-image request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text
    pub prompt: String,
    /// Noise seed
    pub seed: u32,
    /// Diffusion steps
    pub steps: u32,
    /// Guidance scale
    pub cfg_scale: f32,
    /// Requested width in pixels
    pub width: u32,
    /// Requested height in pixels
    pub height: u32,
    /// Images to return for this prompt
    pub samples: u32,
    /// Sampler to use
    pub sampler: Sampler,
}

/// A generated image as returned by the service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Artifact {
    /// Encoded image bytes, written to disk as is
    pub binary: Vec<u8>,
    /// Seed the service reports for this artifact
    pub seed: Option<u64>,
    /// Why generation stopped, eg `SUCCESS` or `CONTENT_FILTERED`
    pub finish_reason: Option<String>,
}

/// Something that turns prompts into images.
pub trait ImageGenerationClient {
    /// Run one generation request.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Vec<Artifact>, GenerationError>> + Send;

    /// Largest width or height the backend accepts, if it has a limit.
    fn max_dimension(&self) -> Option<u32> {
        None
    }
}
