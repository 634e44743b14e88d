// SPDX-License-Identifier: MPL-2.0

//! GIF decoding into full-screen raw frames.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use gif::DisposalMethod;
use image::{DynamicImage, Rgba, RgbaImage};

use super::types::RawFrame;
use crate::error::Error;

/// Opens animation files for frame-by-frame reading.
pub trait Decoder {
    type Source: FrameSource;

    /// Open `path` and read its header.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid animation.
    fn open(&self, path: &Path) -> Result<Self::Source, Error>;
}

/// An opened animation yielding raw frames in order. Dropping it closes it.
pub trait FrameSource {
    fn path(&self) -> &Path;
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Decode the next frame, or `None` once every frame has been read.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or malformed frame data.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GifDecoder;

impl Decoder for GifDecoder {
    type Source = GifSource;

    fn open(&self, path: &Path) -> Result<GifSource, Error> {
        let file = File::open(path).map_err(|why| Error::decode(path, why))?;

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let decoder = options
            .read_info(BufReader::new(file))
            .map_err(|why| Error::decode(path, why))?;

        let (width, height) = (u32::from(decoder.width()), u32::from(decoder.height()));
        tracing::debug!(path = %path.display(), width, height, "opened gif");

        Ok(GifSource {
            path: path.to_path_buf(),
            decoder,
            canvas: RgbaImage::new(width, height),
            disposal: None,
        })
    }
}

/// Restores the logical screen after a frame, as its disposal method asks.
enum Disposal {
    Clear { x: u32, y: u32, width: u32, height: u32 },
    Restore(RgbaImage),
}

pub struct GifSource {
    path: PathBuf,
    decoder: gif::Decoder<BufReader<File>>,
    canvas: RgbaImage,
    disposal: Option<Disposal>,
}

impl GifSource {
    fn dispose(&mut self) {
        match self.disposal.take() {
            Some(Disposal::Clear {
                x,
                y,
                width,
                height,
            }) => {
                for py in y..(y + height).min(self.canvas.height()) {
                    for px in x..(x + width).min(self.canvas.width()) {
                        self.canvas.put_pixel(px, py, Rgba([0, 0, 0, 0]));
                    }
                }
            }
            Some(Disposal::Restore(previous)) => self.canvas = previous,
            None => {}
        }
    }
}

impl FrameSource for GifSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn width(&self) -> u32 {
        self.canvas.width()
    }

    fn height(&self) -> u32 {
        self.canvas.height()
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, Error> {
        self.dispose();

        let frame = match self.decoder.read_next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(why) => return Err(Error::decode(&self.path, why)),
        };

        let (left, top) = (u32::from(frame.left), u32::from(frame.top));
        let (width, height) = (u32::from(frame.width), u32::from(frame.height));

        self.disposal = match frame.dispose {
            DisposalMethod::Background => Some(Disposal::Clear {
                x: left,
                y: top,
                width,
                height,
            }),
            DisposalMethod::Previous => Some(Disposal::Restore(self.canvas.clone())),
            _ => None,
        };

        // Transparent pixels leave the logical screen untouched.
        for (i, pixel) in frame.buffer.chunks_exact(4).enumerate() {
            if pixel[3] == 0 {
                continue;
            }

            let x = left + i as u32 % width;
            let y = top + i as u32 / width;
            if x < self.canvas.width() && y < self.canvas.height() {
                self.canvas
                    .put_pixel(x, y, Rgba([pixel[0], pixel[1], pixel[2], u8::MAX]));
            }
        }

        Ok(Some(DynamicImage::ImageRgba8(self.canvas.clone()).into_rgb8()))
    }
}
