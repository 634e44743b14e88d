// SPDX-License-Identifier: MPL-2.0

//! Slideshow playback.
//!
//! While the current animation plays, the next one is opened and decoded a few
//! frames per iteration, as many as fit in what is left of the frame budget.
//! When the slide deadline fires, whatever remains of the next animation is
//! decoded in one go, the two are swapped, and the old frames are released
//! after the first frame of the new animation has been shown.

use std::{path::Path, time::Instant};

use gifpaper_config::SamplingMethod;
use tracing::{debug, info, warn};

use super::decoder::{Decoder, FrameSource};
use super::player::{Player, Stage};
use super::types::{FrameOptions, Pacing};
use crate::clock::Clock;
use crate::error::Error;
use crate::frame_list::{FrameChain, FrameList};
use crate::playlist::Playlist;
use crate::power::PowerPolicy;
use crate::sink::DisplaySink;
use crate::timer::Deadline;

/// The next animation, decoded a few frames at a time.
struct Prefetch<F, S> {
    source: F,
    chain: FrameChain<S>,
    exhausted: bool,
}

pub struct Slideshow<D, K, C, P, T>
where
    D: Decoder,
    K: DisplaySink,
{
    player: Player<K, C, P>,
    decoder: D,
    playlist: Playlist,
    options: FrameOptions,
    deadline: T,
    next: Option<Prefetch<D::Source, K::Surface>>,
    retired: Option<FrameList<K::Surface>>,
}

impl<D, K, C, P, T> Slideshow<D, K, C, P, T>
where
    D: Decoder,
    K: DisplaySink,
    C: Clock,
    P: PowerPolicy,
    T: Deadline,
{
    /// One display iteration, with prefetching and swapping folded in.
    ///
    /// # Errors
    ///
    /// Fails once no entry of the playlist can be opened any more, or when the
    /// deadline cannot be re-armed.
    pub fn step(&mut self) -> Result<Pacing, Error> {
        if self.deadline.take_expired() {
            self.swap()?;
        }

        let start = self.player.present();

        if let Some(old) = self.retired.take() {
            old.release(self.player.sink_mut());
        }

        if self.next.is_none() {
            self.open_next()?;
        } else {
            self.prefetch(start);
        }

        Ok(self.player.pace(start))
    }

    /// Open the next readable entry of the playlist.
    fn open_next(&mut self) -> Result<(), Error> {
        for _ in 0..self.playlist.len() {
            let path = self.playlist.next_path();

            match self.decoder.open(path) {
                Ok(source) => {
                    debug!(path = %path.display(), "queueing next animation");
                    self.next = Some(Prefetch {
                        source,
                        chain: FrameChain::new(),
                        exhausted: false,
                    });
                    return Ok(());
                }
                Err(why) => warn!("{why}, skipping"),
            }
        }

        Err(Error::NoReadableAnimations(self.playlist.dir().to_path_buf()))
    }

    /// Decode frames of the next animation until the load projection for
    /// another one would overrun the budget.
    fn prefetch(&mut self, start: Instant) {
        let Some(next) = self.next.as_mut() else {
            return;
        };

        if next.exhausted {
            return;
        }

        let budget = self.player.budget();

        loop {
            let load_start = self.player.now();

            match next
                .chain
                .queue_one(&mut next.source, &self.options, self.player.sink_mut())
            {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(frames = next.chain.len(), "next animation fully queued");
                    next.exhausted = true;
                    break;
                }
                Err(why) => {
                    warn!("{why}, treating it as the end of the animation");
                    next.exhausted = true;
                    break;
                }
            }

            let end = self.player.now();
            let load = end.saturating_duration_since(load_start);
            let projection = end.saturating_duration_since(start) + load + load / 5;

            if projection >= budget {
                break;
            }
        }
    }

    /// Finish the next animation and make it current.
    fn swap(&mut self) -> Result<(), Error> {
        self.deadline.arm()?;

        let Some(Prefetch {
            mut source,
            mut chain,
            exhausted,
        }) = self.next.take()
        else {
            warn!("next animation is not ready yet, keeping the current one");
            return Ok(());
        };

        if !exhausted {
            warn!(path = %source.path().display(), "delaying play to finish queueing next animation");

            loop {
                match chain.queue_one(&mut source, &self.options, self.player.sink_mut()) {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(why) => {
                        warn!("{why}, treating it as the end of the animation");
                        break;
                    }
                }
            }
        }

        match chain.close() {
            Some(frames) => {
                info!(path = %source.path().display(), frames = frames.len(), "switching animation");
                self.retired = Some(self.player.replace_frames(frames));
            }
            None => {
                warn!(path = %source.path().display(), "next animation has no frames, keeping the current one");
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn player(&self) -> &Player<K, C, P> {
        &self.player
    }

    /// Release every frame, including a partly decoded next animation.
    pub fn release(mut self) -> Stage<K, C, P> {
        let sink = self.player.sink_mut();

        if let Some(old) = self.retired.take() {
            old.release(sink);
        }

        if let Some(next) = self.next.take() {
            next.chain.release(sink);
        }

        self.player.release()
    }
}

/// What the event loop drives.
pub enum Playback<D, K, C, P, T>
where
    D: Decoder,
    K: DisplaySink,
{
    Single(Player<K, C, P>),
    Slideshow(Slideshow<D, K, C, P, T>),
}

impl<D, K, C, P, T> Playback<D, K, C, P, T>
where
    D: Decoder,
    K: DisplaySink,
    C: Clock,
    P: PowerPolicy,
    T: Deadline,
{
    /// Play the animation at `path` forever.
    ///
    /// # Errors
    ///
    /// Fails if the animation cannot be loaded.
    pub fn single(
        path: &Path,
        decoder: &D,
        options: &FrameOptions,
        stage: Stage<K, C, P>,
    ) -> Result<Self, Error> {
        Player::open(path, decoder, options, stage).map(Self::Single)
    }

    /// Rotate through the animations in `dir`.
    ///
    /// A directory holding a single file plays it like [`Playback::single`]
    /// and never builds a deadline.
    ///
    /// # Errors
    ///
    /// Fails if the directory is empty, none of its files can be loaded, or
    /// the deadline cannot be armed.
    pub fn slideshow(
        dir: &Path,
        sampling: SamplingMethod,
        decoder: D,
        options: FrameOptions,
        mut stage: Stage<K, C, P>,
        make_deadline: impl FnOnce() -> T,
    ) -> Result<Self, Error> {
        let mut playlist = Playlist::from_dir(dir, sampling)?;

        if playlist.is_single() {
            info!("only one animation found, no slideshow needed");
            let path = playlist.next_path().to_path_buf();
            return Self::single(&path, &decoder, &options, stage);
        }

        let mut first = None;
        for _ in 0..playlist.len() {
            let path = playlist.next_path();
            match decoder
                .open(path)
                .and_then(|source| FrameList::load(source, &options, &mut stage.sink))
            {
                Ok(frames) => {
                    first = Some(frames);
                    break;
                }
                Err(why) => warn!("{why}, skipping"),
            }
        }

        let Some(frames) = first else {
            return Err(Error::NoReadableAnimations(dir.to_path_buf()));
        };

        let mut deadline = make_deadline();
        if let Err(why) = deadline.arm() {
            frames.release(&mut stage.sink);
            return Err(why);
        }

        Ok(Self::Slideshow(Slideshow {
            player: Player::new(frames, stage),
            decoder,
            playlist,
            options,
            deadline,
            next: None,
            retired: None,
        }))
    }

    /// Run one iteration.
    ///
    /// # Errors
    ///
    /// Only a slideshow can fail, once it has nothing left to play or its
    /// deadline cannot be re-armed.
    pub fn step(&mut self) -> Result<Pacing, Error> {
        match self {
            Self::Single(player) => Ok(player.step()),
            Self::Slideshow(slideshow) => slideshow.step(),
        }
    }

    #[must_use]
    pub fn player(&self) -> &Player<K, C, P> {
        match self {
            Self::Single(player) => player,
            Self::Slideshow(slideshow) => slideshow.player(),
        }
    }

    pub fn release(self) -> Stage<K, C, P> {
        match self {
            Self::Single(player) => player.release(),
            Self::Slideshow(slideshow) => slideshow.release(),
        }
    }
}
