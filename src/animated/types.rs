// SPDX-License-Identifier: MPL-2.0

//! Core types for animated wallpaper playback.

use std::time::Duration;

use gifpaper_config::Crop;
use image::RgbImage;

use super::pattern::StoragePlan;

/// A fully composited frame as produced by a decoder: packed RGB rows.
pub type RawFrame = RgbImage;

/// How a frame's pixels are kept between displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Converted to a sink surface as soon as it is decoded.
    Realized,
    /// Kept as a raw buffer and converted on first display.
    Buffered,
}

/// Per-animation decoding options, fixed for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct FrameOptions {
    pub plan: StoragePlan,
    pub crop: Option<Crop>,
}

/// What the event loop should do once an iteration has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// The iteration fit the frame budget; wait out the remainder.
    Sleep(Duration),
    /// The iteration overran the frame budget by the given elapsed time.
    Late(Duration),
}

impl Pacing {
    /// Delay before the next iteration.
    #[must_use]
    pub fn delay(self) -> Duration {
        match self {
            Pacing::Sleep(remaining) => remaining,
            Pacing::Late(_) => Duration::ZERO,
        }
    }
}
