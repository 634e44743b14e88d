// SPDX-License-Identifier: MPL-2.0

//! Circular frame lists.
//!
//! Frames live in an arena and link to each other by index, so following
//! `next` from any frame `len()` times lands back on it and `prev` undoes
//! `next`. A list is built in two steps: a [`FrameChain`] grows one decoded
//! frame at a time, then [`FrameChain::close`] joins its ends into a
//! [`FrameList`].
//!
//! Each frame either owns a sink surface ([`StorageKind::Realized`]) or keeps
//! its RGBA pixels and creates the surface the first time it is shown
//! ([`StorageKind::Buffered`]). Every surface is handed back to the sink
//! exactly once, when the list is released.

use image::{DynamicImage, RgbaImage};

use crate::animated::{FrameOptions, FrameSource, RawFrame, StorageKind};
use crate::error::{DecodeError, Error};
use crate::scaler;
use crate::sink::DisplaySink;

/// Index of the frame a closed list is entered through.
pub const HEAD: usize = 0;

/// Pixels of one frame, in one of the two storage representations.
#[derive(Debug)]
pub enum Storage<S> {
    Realized(S),
    Buffered { image: RgbaImage, surface: Option<S> },
}

impl<S> Storage<S> {
    #[cfg(test)]
    #[must_use]
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Realized(_) => StorageKind::Realized,
            Self::Buffered { .. } => StorageKind::Buffered,
        }
    }

    /// Convert a decoded frame into its storage, cropping it first.
    pub fn prepare<K>(raw: RawFrame, kind: StorageKind, options: &FrameOptions, sink: &mut K) -> Self
    where
        K: DisplaySink<Surface = S>,
    {
        let raw = match options.crop {
            Some(ref crop) => scaler::crop(&raw, crop),
            None => raw,
        };

        let image = DynamicImage::ImageRgb8(raw).into_rgba8();

        match kind {
            StorageKind::Realized => Self::Realized(sink.realize(&image)),
            StorageKind::Buffered => Self::Buffered {
                image,
                surface: None,
            },
        }
    }

    /// Present this frame, realizing a buffered frame on first use.
    pub fn show<K>(&mut self, sink: &mut K)
    where
        K: DisplaySink<Surface = S>,
    {
        let surface = match self {
            Self::Realized(surface) => surface,
            Self::Buffered { image, surface } => surface.get_or_insert_with(|| sink.realize(image)),
        };

        sink.show(surface);
    }

    /// Hand every surface this frame owns back to the sink.
    pub fn release<K>(self, sink: &mut K)
    where
        K: DisplaySink<Surface = S>,
    {
        match self {
            Self::Realized(surface) => sink.release(surface),
            Self::Buffered { surface, .. } => {
                if let Some(surface) = surface {
                    sink.release(surface);
                }
            }
        }
    }
}

#[derive(Debug)]
struct Frame<S> {
    storage: Storage<S>,
    next: usize,
    prev: usize,
}

/// A frame list still being decoded; its ends are not yet joined.
#[derive(Debug)]
pub struct FrameChain<S> {
    frames: Vec<Frame<S>>,
}

impl<S> Default for FrameChain<S> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<S> FrameChain<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Append a frame after the current tail, returning its index.
    pub fn push(&mut self, storage: Storage<S>) -> usize {
        let index = self.frames.len();
        let prev = index.saturating_sub(1);

        if let Some(tail) = self.frames.last_mut() {
            tail.next = index;
        }

        self.frames.push(Frame {
            storage,
            next: HEAD,
            prev,
        });

        index
    }

    /// Decode the next frame of `source` and append it.
    ///
    /// Returns the new frame's index, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates decoder failures; frames queued so far are kept.
    pub fn queue_one<F, K>(
        &mut self,
        source: &mut F,
        options: &FrameOptions,
        sink: &mut K,
    ) -> Result<Option<usize>, Error>
    where
        F: FrameSource,
        K: DisplaySink<Surface = S>,
    {
        let Some(raw) = source.next_frame()? else {
            return Ok(None);
        };

        let index = self.frames.len();
        let kind = options.plan.kind_for(index);
        tracing::trace!(index, ?kind, "queueing frame");

        Ok(Some(self.push(Storage::prepare(raw, kind, options, sink))))
    }

    /// Show a frame that has already been queued.
    pub fn show<K>(&mut self, index: usize, sink: &mut K)
    where
        K: DisplaySink<Surface = S>,
    {
        self.frames[index].storage.show(sink);
    }

    /// Join the tail back to the head. An empty chain has no list.
    #[must_use]
    pub fn close(mut self) -> Option<FrameList<S>> {
        let tail = self.frames.len().checked_sub(1)?;
        self.frames[tail].next = HEAD;
        self.frames[HEAD].prev = tail;

        Some(FrameList {
            frames: self.frames,
        })
    }

    /// Abandon the chain, releasing what it holds.
    pub fn release<K>(self, sink: &mut K)
    where
        K: DisplaySink<Surface = S>,
    {
        if let Some(list) = self.close() {
            list.release(sink);
        }
    }
}

/// A closed, circular list of frames.
#[derive(Debug)]
pub struct FrameList<S> {
    frames: Vec<Frame<S>>,
}

impl<S> FrameList<S> {
    /// Decode every frame of `source` into a list.
    ///
    /// The first frame is shown as soon as it is ready.
    ///
    /// # Errors
    ///
    /// Fails if the source errors out or yields no frames. Anything realized
    /// before the failure is released.
    pub fn load<F, K>(mut source: F, options: &FrameOptions, sink: &mut K) -> Result<Self, Error>
    where
        F: FrameSource,
        K: DisplaySink<Surface = S>,
    {
        let mut chain = FrameChain::new();

        loop {
            match chain.queue_one(&mut source, options, sink) {
                Ok(Some(HEAD)) => chain.show(HEAD, sink),
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(why) => {
                    chain.release(sink);
                    return Err(why);
                }
            }
        }

        let list = chain
            .close()
            .ok_or_else(|| Error::decode(source.path(), DecodeError::NoFrames))?;

        tracing::info!(
            path = %source.path().display(),
            frames = list.len(),
            width = source.width(),
            height = source.height(),
            "loaded animation"
        );

        Ok(list)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn head(&self) -> usize {
        HEAD
    }

    #[must_use]
    pub fn next(&self, index: usize) -> usize {
        self.frames[index].next
    }

    #[cfg(test)]
    #[must_use]
    pub fn prev(&self, index: usize) -> usize {
        self.frames[index].prev
    }

    #[cfg(test)]
    #[must_use]
    pub fn storage_kind(&self, index: usize) -> StorageKind {
        self.frames[index].storage.kind()
    }

    /// Whether the frame at `index` currently owns a surface.
    #[cfg(test)]
    #[must_use]
    pub fn has_surface(&self, index: usize) -> bool {
        match &self.frames[index].storage {
            Storage::Realized(_) => true,
            Storage::Buffered { surface, .. } => surface.is_some(),
        }
    }

    pub fn show<K>(&mut self, index: usize, sink: &mut K)
    where
        K: DisplaySink<Surface = S>,
    {
        self.frames[index].storage.show(sink);
    }

    /// Release every frame, starting after the head and wrapping back to it.
    pub fn release<K>(self, sink: &mut K)
    where
        K: DisplaySink<Surface = S>,
    {
        let links: Vec<usize> = self.frames.iter().map(|frame| frame.next).collect();
        let mut slots: Vec<Option<Storage<S>>> =
            self.frames.into_iter().map(|frame| Some(frame.storage)).collect();

        let mut index = links[HEAD];
        while index != HEAD {
            if let Some(storage) = slots[index].take() {
                storage.release(sink);
            }
            index = links[index];
        }

        if let Some(storage) = slots[HEAD].take() {
            storage.release(sink);
        }
    }
}
