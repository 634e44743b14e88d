// SPDX-License-Identifier: MPL-2.0

//! Display sinks: where realized frames end up.
//!
//! The schedulers only ever talk to [`DisplaySink`]. [`SoftwareSink`] is the
//! sink shipped with the binary: it lays each frame out across the configured
//! heads, scales it, and converts it into an XRGB8888 canvas that `show`
//! presents as the front buffer.

use gifpaper_config::{Config, DisplayMode, Head, ScalingMode};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use crate::draw::{self, BYTES_PER_PIXEL};
use crate::scaler;

/// Turns frames into displayable surfaces and presents them.
pub trait DisplaySink {
    /// A frame converted into the sink's native representation.
    type Surface;

    /// Convert an RGBA frame into a surface.
    fn realize(&mut self, frame: &RgbaImage) -> Self::Surface;

    /// Make the surface the visible output.
    fn show(&mut self, surface: &Self::Surface);

    /// Give the surface's resources back to the sink.
    fn release(&mut self, surface: Self::Surface);
}

/// A canvas ready to be copied to the front buffer.
#[derive(Debug)]
pub struct Surface {
    id: u64,
    pixels: Vec<u8>,
}

impl Surface {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Software compositor covering the bounding box of all configured heads.
#[derive(Debug)]
pub struct SoftwareSink {
    width: u32,
    height: u32,
    heads: Vec<Head>,
    mode: DisplayMode,
    scaling: ScalingMode,
    filter: FilterType,
    front: Vec<u8>,
    presented: Option<u64>,
    next_id: u64,
    live: usize,
}

impl SoftwareSink {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let heads = config.outputs.clone();
        let (width, height) = heads.iter().fold((0, 0), |(w, h), head| {
            (w.max(head.x + head.width), h.max(head.y + head.height))
        });

        tracing::info!(width, height, heads = heads.len(), mode = ?config.display_mode, "software sink");

        Self {
            width,
            height,
            heads,
            mode: config.display_mode,
            scaling: config.scaling_mode,
            filter: config.filter_method.into(),
            front: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            presented: None,
            next_id: 0,
            live: 0,
        }
    }

    /// Size of the virtual screen.
    #[cfg(test)]
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The currently visible canvas.
    #[cfg(test)]
    #[must_use]
    pub fn front(&self) -> &[u8] {
        &self.front
    }

    /// Id of the surface last shown.
    #[cfg(test)]
    #[must_use]
    pub fn presented(&self) -> Option<u64> {
        self.presented
    }

    /// Number of realized surfaces not yet released.
    #[must_use]
    pub fn live_surfaces(&self) -> usize {
        self.live
    }

    fn place(&self, canvas: &mut RgbaImage, frame: &RgbaImage, area: Head) {
        let scaled = scaler::scale(frame, &self.scaling, self.filter, area.width, area.height);
        image::imageops::replace(canvas, &scaled, area.x.into(), area.y.into());
    }
}

impl DisplaySink for SoftwareSink {
    type Surface = Surface;

    fn realize(&mut self, frame: &RgbaImage) -> Surface {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, Rgba([0, 0, 0, u8::MAX]));

        match self.mode {
            DisplayMode::Single => {
                if let Some(head) = self.heads.first() {
                    self.place(&mut canvas, frame, *head);
                }
            }
            DisplayMode::Replicate => {
                for head in &self.heads {
                    self.place(&mut canvas, frame, *head);
                }
            }
            DisplayMode::Extend => {
                let area = Head {
                    x: 0,
                    y: 0,
                    width: self.width,
                    height: self.height,
                };
                self.place(&mut canvas, frame, area);
            }
        }

        let mut pixels = vec![0; self.front.len()];
        draw::xrgb8888_canvas(&mut pixels, &canvas);

        let id = self.next_id;
        self.next_id += 1;
        self.live += 1;

        Surface { id, pixels }
    }

    fn show(&mut self, surface: &Surface) {
        self.front.copy_from_slice(&surface.pixels);
        self.presented = Some(surface.id);
        tracing::trace!(surface = surface.id, "presented");
    }

    fn release(&mut self, surface: Surface) {
        self.live = self.live.saturating_sub(1);
        tracing::trace!(surface = surface.id, live = self.live, "released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_at(sink: &SoftwareSink, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * sink.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut px = [0; 4];
        px.copy_from_slice(&sink.front()[offset..offset + BYTES_PER_PIXEL]);
        px
    }

    fn two_heads(mode: DisplayMode) -> Config {
        Config::default()
            .display_mode(mode)
            .scaling_mode(ScalingMode::Stretch)
            .outputs(vec![
                Head {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4,
                },
                Head {
                    x: 4,
                    y: 0,
                    width: 4,
                    height: 4,
                },
            ])
    }

    #[test]
    fn test_canvas_covers_all_heads() {
        let sink = SoftwareSink::new(&two_heads(DisplayMode::Single));
        assert_eq!(sink.dimensions(), (8, 4));
        assert_eq!(sink.front().len(), 8 * 4 * BYTES_PER_PIXEL);
    }

    #[test]
    fn test_single_mode_draws_first_head_only() {
        let mut sink = SoftwareSink::new(&two_heads(DisplayMode::Single));
        let surface = sink.realize(&RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        sink.show(&surface);

        assert_eq!(pixel_at(&sink, 1, 1), [30, 20, 10, 0]);
        assert_eq!(pixel_at(&sink, 6, 1), [0, 0, 0, 0]);
        sink.release(surface);
    }

    #[test]
    fn test_replicate_mode_draws_every_head() {
        let mut sink = SoftwareSink::new(&two_heads(DisplayMode::Replicate));
        let surface = sink.realize(&RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        sink.show(&surface);

        assert_eq!(pixel_at(&sink, 1, 1), [30, 20, 10, 0]);
        assert_eq!(pixel_at(&sink, 6, 1), [30, 20, 10, 0]);
        sink.release(surface);
    }

    #[test]
    fn test_extend_mode_spans_heads() {
        let mut sink = SoftwareSink::new(&two_heads(DisplayMode::Extend));
        // Left half red, right half blue: extended, each head sees one half.
        let frame = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let surface = sink.realize(&frame);
        sink.show(&surface);

        assert_eq!(pixel_at(&sink, 1, 2), [0, 0, 255, 0]);
        assert_eq!(pixel_at(&sink, 6, 2), [255, 0, 0, 0]);
        sink.release(surface);
    }

    #[test]
    fn test_surfaces_are_accounted() {
        let mut sink = SoftwareSink::new(&Config::default().outputs(vec![Head {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        }]));
        let frame = RgbaImage::new(1, 1);

        let a = sink.realize(&frame);
        let b = sink.realize(&frame);
        assert_ne!(a.id(), b.id());
        assert_eq!(sink.live_surfaces(), 2);

        sink.show(&b);
        assert_eq!(sink.presented(), Some(b.id()));

        sink.release(a);
        sink.release(b);
        assert_eq!(sink.live_surfaces(), 0);
    }
}
