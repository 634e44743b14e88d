// SPDX-License-Identifier: MPL-2.0

use image::RgbaImage;
use rayon::prelude::*;

/// Bytes per pixel of an XRGB8888 canvas.
pub const BYTES_PER_PIXEL: usize = 4;

/// Draws the image on an 8-bit little-endian XRGB canvas (B, G, R, X in memory).
pub fn xrgb8888_canvas(canvas: &mut [u8], image: &RgbaImage) {
    canvas
        .par_chunks_exact_mut(BYTES_PER_PIXEL)
        .zip(image.as_raw().par_chunks_exact(BYTES_PER_PIXEL))
        .for_each(|(dest, pixel)| {
            let r = u32::from(pixel[0]) << 16;
            let g = u32::from(pixel[1]) << 8;
            let b = u32::from(pixel[2]);

            dest.copy_from_slice(&(r | g | b).to_le_bytes());
        });
}
