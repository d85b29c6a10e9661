use fast_image_resize as fir;
use image::{Rgba, RgbaImage};

use crate::error::{PoseError, Result};

/// Padded dimensions are multiples of this, as multi-pose detectors require.
pub const PAD_MULTIPLE: u32 = 32;

#[derive(Clone, Debug)]
pub struct ResizedImage {
    pub image: RgbaImage,
    pub target_height: u32,
    pub target_width: u32,
    /// Size of the scaled content before padding; the rest is black border.
    pub scaled_height: u32,
    pub scaled_width: u32,
}

/// Scales the longer side to `target_size` keeping the aspect ratio, then pads the
/// bottom/right so both sides are multiples of [`PAD_MULTIPLE`].
pub fn keep_aspect_ratio_resize(image: &RgbaImage, target_size: u32) -> Result<ResizedImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || target_size == 0 {
        return Err(PoseError::InvalidArgument(format!(
            "cannot resize {width}x{height} image to {target_size}"
        )));
    }

    let (scaled_width, scaled_height, target_width, target_height) = if height > width {
        let scaled_width = scale_side(width, height, target_size);
        (
            scaled_width,
            target_size,
            round_up(scaled_width, PAD_MULTIPLE),
            target_size,
        )
    } else {
        let scaled_height = scale_side(height, width, target_size);
        (
            target_size,
            scaled_height,
            target_size,
            round_up(scaled_height, PAD_MULTIPLE),
        )
    };

    let resized = resize_rgba(image, scaled_width.max(1), scaled_height.max(1))?;
    let mut canvas = RgbaImage::from_pixel(target_width, target_height, Rgba([0, 0, 0, 255]));
    image::imageops::replace(&mut canvas, &resized, 0, 0);

    log::debug!(
        "resized {width}x{height} -> {scaled_width}x{scaled_height}, padded to {target_width}x{target_height}"
    );

    Ok(ResizedImage {
        image: canvas,
        target_height,
        target_width,
        scaled_height,
        scaled_width,
    })
}

/// Shorter side after scaling the longer one to `target_size`, rounded up.
fn scale_side(shorter: u32, longer: u32, target_size: u32) -> u32 {
    let scale = f64::from(target_size) / f64::from(longer);
    (f64::from(shorter) * scale).ceil() as u32
}

fn round_up(value: u32, multiple: u32) -> u32 {
    value.div_ceil(multiple) * multiple
}

fn resize_rgba(image: &RgbaImage, new_w: u32, new_h: u32) -> Result<RgbaImage> {
    let src_image = fir::images::Image::from_vec_u8(
        image.width(),
        image.height(),
        image.as_raw().clone(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| PoseError::Image(format!("failed to wrap source image: {err}")))?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .map_err(|err| PoseError::Image(format!("fast resize failed: {err}")))?;

    RgbaImage::from_raw(new_w, new_h, dst_image.into_vec())
        .ok_or_else(|| PoseError::Image("resized buffer has unexpected size".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn landscape_pads_height_to_multiple() {
        let resized = keep_aspect_ratio_resize(&white(640, 480), 256).unwrap();
        assert_eq!((resized.scaled_width, resized.scaled_height), (256, 192));
        assert_eq!((resized.target_width, resized.target_height), (256, 192));
        assert_eq!(resized.image.dimensions(), (256, 192));
    }

    #[test]
    fn portrait_pads_width_with_black() {
        let resized = keep_aspect_ratio_resize(&white(300, 500), 256).unwrap();
        // 300 * 256 / 500 = 153.6 -> 154, padded to 160
        assert_eq!(resized.scaled_width, 154);
        assert_eq!((resized.target_width, resized.target_height), (160, 256));
        assert_eq!(*resized.image.get_pixel(10, 10), Rgba([255, 255, 255, 255]));
        assert_eq!(*resized.image.get_pixel(159, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn scale_does_not_round_up_past_exact_products() {
        // 25 * (192 / 40) is exactly 120 in double precision, 121 in single
        let resized = keep_aspect_ratio_resize(&white(40, 25), 192).unwrap();
        assert_eq!((resized.scaled_width, resized.scaled_height), (192, 120));
        assert_eq!(resized.target_height, 128);

        let resized = keep_aspect_ratio_resize(&white(25, 40), 192).unwrap();
        assert_eq!((resized.scaled_width, resized.scaled_height), (120, 192));
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(matches!(
            keep_aspect_ratio_resize(&RgbaImage::new(0, 10), 256),
            Err(PoseError::InvalidArgument(_))
        ));
    }
}
