// SPDX-License-Identifier: MPL-2.0

//! Frame transforms: cropping of raw frames and fit, stretch, and zoom scaling.

use gifpaper_config::{Crop, ScalingMode};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use crate::animated::RawFrame;

/// Extract the crop rectangle from a raw frame.
///
/// The rectangle is clamped to the frame; the result's dimensions replace the
/// frame's for everything downstream.
#[must_use]
pub fn crop(frame: &RawFrame, crop: &Crop) -> RawFrame {
    image::imageops::crop_imm(frame, crop.x, crop.y, crop.width, crop.height).to_image()
}

/// Scale a frame to the given area according to the scaling mode.
#[must_use]
pub fn scale(
    img: &RgbaImage,
    mode: &ScalingMode,
    filter: FilterType,
    width: u32,
    height: u32,
) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }

    match mode {
        ScalingMode::Fit(color) => fit(img, color, filter, width, height),
        ScalingMode::Stretch => stretch(img, filter, width, height),
        ScalingMode::Zoom => zoom(img, filter, width, height),
    }
}

pub fn fit(
    img: &RgbaImage,
    color: &[f32; 3],
    filter: FilterType,
    layer_width: u32,
    layer_height: u32,
) -> RgbaImage {
    let fill = Rgba([
        (u8::MAX as f32 * color[0]).round() as u8,
        (u8::MAX as f32 * color[1]).round() as u8,
        (u8::MAX as f32 * color[2]).round() as u8,
        u8::MAX,
    ]);
    let mut filled_image = RgbaImage::from_pixel(layer_width, layer_height, fill);

    let (w, h) = img.dimensions();

    let ratio = (layer_width as f64 / w as f64).min(layer_height as f64 / h as f64);

    let (new_width, new_height) = (
        ((w as f64 * ratio).round() as u32).clamp(1, layer_width),
        ((h as f64 * ratio).round() as u32).clamp(1, layer_height),
    );

    let resized_image = image::imageops::resize(img, new_width, new_height, filter);

    image::imageops::replace(
        &mut filled_image,
        &resized_image,
        ((layer_width - new_width) / 2).into(),
        ((layer_height - new_height) / 2).into(),
    );

    filled_image
}

pub fn stretch(img: &RgbaImage, filter: FilterType, layer_width: u32, layer_height: u32) -> RgbaImage {
    image::imageops::resize(img, layer_width, layer_height, filter)
}

pub fn zoom(img: &RgbaImage, filter: FilterType, layer_width: u32, layer_height: u32) -> RgbaImage {
    let (w, h) = img.dimensions();

    let ratio = (layer_width as f64 / w as f64).max(layer_height as f64 / h as f64);

    let (new_width, new_height) = (
        ((w as f64 * ratio).round() as u32).max(layer_width),
        ((h as f64 * ratio).round() as u32).max(layer_height),
    );

    let new_image = image::imageops::resize(img, new_width, new_height, filter);

    image::imageops::crop_imm(
        &new_image,
        (new_width - layer_width) / 2,
        (new_height - layer_height) / 2,
        layer_width,
        layer_height,
    )
    .to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RawFrame {
        RawFrame::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn test_crop_extracts_sub_rectangle() {
        let frame = gradient(8, 6);
        let cropped = crop(
            &frame,
            &Crop {
                x: 2,
                y: 1,
                width: 3,
                height: 4,
            },
        );

        assert_eq!(cropped.dimensions(), (3, 4));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([2, 1, 0]));
        assert_eq!(cropped.get_pixel(2, 3), &Rgb([4, 4, 0]));
    }

    #[test]
    fn test_crop_is_clamped_to_frame() {
        let frame = gradient(8, 6);
        let cropped = crop(
            &frame,
            &Crop {
                x: 6,
                y: 4,
                width: 10,
                height: 10,
            },
        );

        assert_eq!(cropped.dimensions(), (2, 2));
    }

    #[test]
    fn test_fit_letterboxes_with_color() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let fitted = fit(&img, &[1.0, 0.0, 0.0], FilterType::Nearest, 20, 10);

        assert_eq!(fitted.dimensions(), (20, 10));
        assert_eq!(fitted.get_pixel(0, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(fitted.get_pixel(10, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_stretch_and_zoom_fill_the_area() {
        let img = RgbaImage::from_pixel(4, 2, Rgba([1, 2, 3, 255]));

        assert_eq!(stretch(&img, FilterType::Nearest, 9, 7).dimensions(), (9, 7));
        assert_eq!(zoom(&img, FilterType::Nearest, 9, 7).dimensions(), (9, 7));
    }

    #[test]
    fn test_scale_is_identity_at_native_size() {
        let img = RgbaImage::from_pixel(5, 5, Rgba([9, 9, 9, 255]));
        let scaled = scale(&img, &ScalingMode::Zoom, FilterType::Lanczos3, 5, 5);
        assert_eq!(scaled, img);
    }
}
