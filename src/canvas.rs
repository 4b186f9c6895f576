use anyhow::anyhow;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};

use crate::error::{DesignError, Result};

/// Working canvas edge length expected by the image-edit endpoint.
pub const CANVAS_SIZE: u32 = 1024;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Fit an arbitrary raster image onto a transparent `target_size` square.
///
/// The image is scaled uniformly so its longer side fills the square, pasted
/// centered, and re-encoded as PNG. Feeding the output back in at the same
/// size is a no-op.
pub fn normalize(image_bytes: &[u8], target_size: u32) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|err| DesignError::Decode(err.to_string()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();

    let ratio = width as f64 / height as f64;
    let (scaled_width, scaled_height) = if ratio > 1.0 {
        (
            target_size,
            ((target_size as f64 / ratio).round() as u32).max(1),
        )
    } else {
        (
            ((target_size as f64 * ratio).round() as u32).max(1),
            target_size,
        )
    };

    let resized = if (scaled_width, scaled_height) == (width, height) {
        decoded
    } else {
        imageops::resize(
            &decoded,
            scaled_width,
            scaled_height,
            imageops::FilterType::Lanczos3,
        )
    };

    let mut canvas = RgbaImage::from_pixel(target_size, target_size, TRANSPARENT);
    let paste_x = (target_size - scaled_width) / 2;
    let paste_y = (target_size - scaled_height) / 2;
    imageops::replace(&mut canvas, &resized, paste_x as i64, paste_y as i64);

    encode_png(canvas)
}

/// Build the edit mask for a `target_size` square canvas: an opaque white
/// border frame (preserved by the service) around a fully transparent
/// interior (editable).
pub fn build_mask(target_size: u32) -> Result<Vec<u8>> {
    let border = border_width(target_size);
    let mut mask = RgbaImage::from_pixel(target_size, target_size, TRANSPARENT);

    for y in 0..target_size {
        for x in 0..target_size {
            let in_border = x < border
                || x >= target_size - border
                || y < border
                || y >= target_size - border;
            if in_border {
                mask.put_pixel(x, y, OPAQUE_WHITE);
            }
        }
    }

    encode_png(mask)
}

pub fn border_width(target_size: u32) -> u32 {
    target_size / 20
}

fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|err| anyhow!("encode png failed: {err}"))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_png(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        encode_png(RgbaImage::from_pixel(width, height, pixel)).unwrap()
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn landscape_image_fills_width_and_centers_vertically() {
        let red = Rgba([255, 0, 0, 255]);
        let normalized = normalize(&solid_png(200, 100, red), 64).unwrap();
        let canvas = decode(&normalized);
        assert_eq!(canvas.dimensions(), (64, 64));

        // 200x100 at 64 scales to 64x32, pasted at y = 16.
        assert_eq!(*canvas.get_pixel(0, 15), TRANSPARENT);
        assert_eq!(*canvas.get_pixel(0, 16), red);
        assert_eq!(*canvas.get_pixel(63, 47), red);
        assert_eq!(*canvas.get_pixel(0, 48), TRANSPARENT);
    }

    #[test]
    fn portrait_image_fills_height_and_centers_horizontally() {
        let blue = Rgba([0, 0, 255, 255]);
        let normalized = normalize(&solid_png(50, 100, blue), 64).unwrap();
        let canvas = decode(&normalized);
        assert_eq!(canvas.dimensions(), (64, 64));

        // 50x100 at 64 scales to 32x64, pasted at x = 16.
        assert_eq!(*canvas.get_pixel(15, 0), TRANSPARENT);
        assert_eq!(*canvas.get_pixel(16, 0), blue);
        assert_eq!(*canvas.get_pixel(47, 63), blue);
        assert_eq!(*canvas.get_pixel(48, 63), TRANSPARENT);
    }

    #[test]
    fn output_is_square_across_aspect_ratios() {
        for (width, height) in [(1, 1), (3, 7), (7, 3), (640, 480), (1000, 999), (1, 100)] {
            let normalized =
                normalize(&solid_png(width, height, Rgba([9, 9, 9, 255])), 96).unwrap();
            assert_eq!(decode(&normalized).dimensions(), (96, 96));
        }
    }

    #[test]
    fn extreme_aspect_ratio_keeps_at_least_one_pixel() {
        let normalized = normalize(&solid_png(1000, 1, Rgba([1, 2, 3, 255])), 32).unwrap();
        assert_eq!(decode(&normalized).dimensions(), (32, 32));
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(&solid_png(200, 100, Rgba([10, 20, 30, 255])), 64).unwrap();
        let twice = normalize(&once, 64).unwrap();
        assert_eq!(decode(&once), decode(&twice));
    }

    #[test]
    fn unparseable_bytes_are_a_decode_error() {
        let result = normalize(b"definitely not an image", 64);
        assert!(matches!(result, Err(DesignError::Decode(_))));
    }

    #[test]
    fn mask_border_is_opaque_white_and_interior_transparent() {
        let size = 100;
        let mask = decode(&build_mask(size).unwrap());
        assert_eq!(mask.dimensions(), (size, size));

        let border = border_width(size);
        assert_eq!(border, 5);
        for y in 0..size {
            for x in 0..size {
                let in_border = x < border || x >= size - border || y < border || y >= size - border;
                let expected = if in_border { OPAQUE_WHITE } else { TRANSPARENT };
                assert_eq!(*mask.get_pixel(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn mask_border_width_is_five_percent_floored() {
        assert_eq!(border_width(1024), 51);
        assert_eq!(border_width(64), 3);
        assert_eq!(border_width(19), 0);
    }
}
