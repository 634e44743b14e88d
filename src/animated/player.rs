// SPDX-License-Identifier: MPL-2.0

//! Single-animation playback.
//!
//! [`Player`] loops one [`FrameList`] forever at a fixed frame budget. Every
//! iteration shows the current frame, advances, and reports how long the event
//! loop should wait before the next one.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use tracing::warn;

use super::decoder::Decoder;
use super::types::{FrameOptions, Pacing};
use crate::clock::Clock;
use crate::error::Error;
use crate::frame_list::FrameList;
use crate::power::PowerPolicy;
use crate::sink::DisplaySink;

/// Everything a player needs besides its frames.
#[derive(Debug)]
pub struct Stage<K, C, P> {
    pub sink: K,
    pub clock: C,
    pub power: P,
    /// Time allotted to one iteration.
    pub budget: Duration,
}

#[derive(Debug)]
pub struct Player<K: DisplaySink, C, P> {
    frames: FrameList<K::Surface>,
    current: usize,
    stage: Stage<K, C, P>,
}

impl<K, C, P> Player<K, C, P>
where
    K: DisplaySink,
    C: Clock,
    P: PowerPolicy,
{
    pub fn new(frames: FrameList<K::Surface>, stage: Stage<K, C, P>) -> Self {
        Self {
            current: frames.head(),
            frames,
            stage,
        }
    }

    /// Load the animation at `path` in full.
    ///
    /// # Errors
    ///
    /// Fails if the animation cannot be opened or decoded.
    pub fn open<D: Decoder>(
        path: &Path,
        decoder: &D,
        options: &FrameOptions,
        mut stage: Stage<K, C, P>,
    ) -> Result<Self, Error> {
        let source = decoder.open(path)?;
        let frames = FrameList::load(source, options, &mut stage.sink)?;
        Ok(Self::new(frames, stage))
    }

    /// One full iteration: show a frame, then pace.
    pub fn step(&mut self) -> Pacing {
        let start = self.present();
        self.pace(start)
    }

    /// Show the current frame and advance, unless the power policy says no.
    ///
    /// Returns the timestamp the iteration started at.
    pub fn present(&mut self) -> Instant {
        let allowed = self.stage.power.is_display_allowed();
        let start = self.stage.clock.now();

        if allowed {
            self.frames.show(self.current, &mut self.stage.sink);
            self.current = self.frames.next(self.current);
        }

        start
    }

    /// Time left in the budget of the iteration that began at `start`.
    pub fn pace(&self, start: Instant) -> Pacing {
        let elapsed = self.stage.clock.now().saturating_duration_since(start);

        if elapsed >= self.stage.budget {
            warn!(?elapsed, budget = ?self.stage.budget, "timing failure, expect a choppy frame");
            Pacing::Late(elapsed)
        } else {
            Pacing::Sleep(self.stage.budget - elapsed)
        }
    }

    /// Start playing `frames` from their head, handing back the old list.
    pub fn replace_frames(&mut self, frames: FrameList<K::Surface>) -> FrameList<K::Surface> {
        self.current = frames.head();
        std::mem::replace(&mut self.frames, frames)
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.stage.clock.now()
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.stage.budget
    }

    #[must_use]
    pub fn frames(&self) -> &FrameList<K::Surface> {
        &self.frames
    }

    #[cfg(test)]
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.stage.sink
    }

    /// Release every frame and give back the stage.
    pub fn release(mut self) -> Stage<K, C, P> {
        self.frames.release(&mut self.stage.sink);
        self.stage
    }
}
