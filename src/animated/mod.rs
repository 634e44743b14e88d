// SPDX-License-Identifier: MPL-2.0

//! Animated wallpaper playback.
//!
//! # Module Structure
//!
//! - [`types`]: raw frames, storage kinds, per-animation options and pacing
//! - [`pattern`]: hybrid patterns deciding which frames are realized up front
//! - [`decoder`]: the decoder seam and its GIF implementation
//! - [`player`]: single-animation playback
//! - [`slideshow`]: rotation through a directory with prefetching

mod decoder;
mod pattern;
mod player;
mod slideshow;
mod types;

pub use decoder::{FrameSource, GifDecoder};
pub use pattern::StoragePlan;
pub use player::Stage;
pub use slideshow::Playback;
pub use types::{FrameOptions, Pacing, RawFrame, StorageKind};

#[cfg(test)]
pub use decoder::Decoder;
#[cfg(test)]
pub use player::Player;
