//! The fixed catalog of aspect ratios offered for generation.

use std::fmt;

use rand::Rng;
use rand::prelude::*;
use serde::{Serialize, Serializer};

/// A named aspect ratio with explicit pixel dimensions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AspectRatio {
    /// 4:3
    Landscape4x3,
    /// 3:4
    Portrait3x4,
    /// 16:9
    Landscape16x9,
    /// 9:16
    Portrait9x16,
    /// 1:1
    Square,
}

impl AspectRatio {
    /// Every ratio in the catalog.
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait9x16,
        AspectRatio::Square,
    ];

    /// The ratio's display name, eg `16:9`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
            Self::Square => "1:1",
        }
    }

    /// Width in pixels.
    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    /// Height in pixels.
    pub fn height(self) -> u32 {
        self.dimensions().1
    }

    fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Landscape4x3 => (768, 576),
            Self::Portrait3x4 => (576, 768),
            Self::Landscape16x9 => (832, 468),
            Self::Portrait9x16 => (468, 832),
            Self::Square => (640, 640),
        }
    }

    /// Composition hint appended to prompts rendered at this ratio.
    pub fn composition_hint(self) -> &'static str {
        match self {
            Self::Landscape4x3 => "wide composition, horizontal framing",
            Self::Portrait3x4 => "vertical composition, tall framing",
            Self::Landscape16x9 => "cinematic wide composition",
            Self::Portrait9x16 => "vertical cinematic composition",
            Self::Square => "centered composition",
        }
    }

    /// Width and height, each clamped to `max_dimension` when one is set.
    pub fn clamped_dimensions(self, max_dimension: Option<u32>) -> (u32, u32) {
        let (width, height) = self.dimensions();
        match max_dimension {
            Some(max) => (width.min(max), height.min(max)),
            None => (width, height),
        }
    }

    /// Name with the colon swapped out, safe to use in a filename.
    pub fn file_segment(self) -> String {
        self.name().replace(':', "_")
    }

    /// Uniform pick from the catalog.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&AspectRatio::Square)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for AspectRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
