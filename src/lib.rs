//! Alien ceramics batch image generator
//!
//! Composes themed prompts from bundled phrase banks and color families,
//! then drives an image generation API over a batch, saving each artifact
//! and keeping going through rate limits and failed items.

#![allow(clippy::multiple_crate_versions)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::complexity)]
#![deny(clippy::correctness)]
#![deny(clippy::disallowed_methods)]
#![deny(clippy::expect_used)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::panic)]
#![deny(clippy::perf)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::unreachable)]
#![deny(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aspect_ratio;
pub mod cli;
pub mod client;
pub mod color_source;
pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod journal;
pub mod palette;
pub mod prompt;
pub mod vocabulary;
