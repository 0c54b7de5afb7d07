use std::io::Cursor;

use anyhow::Result;
use image::{imageops, ImageFormat, RgbImage};

use crate::models::Orientation;

/// Normalize a raw feed frame to the orientation's exact target dimensions.
///
/// If the feed is wider than the target ratio the crop is width-centered, if
/// taller it is height-centered, then the crop is resized to the target
/// pixels. The output dimensions are independent of the physical camera.
pub fn crop_to_target(frame: &RgbImage, orientation: Orientation) -> RgbImage {
    let (target_w, target_h) = orientation.target_dimensions();
    let (feed_w, feed_h) = frame.dimensions();

    // Ratio comparison via cross-multiplication, exact for any feed size.
    let feed_wider = (feed_w as u64) * (target_h as u64) > (target_w as u64) * (feed_h as u64);

    let (crop_w, crop_h) = if feed_wider {
        let crop_w = ((feed_h as u64 * target_w as u64) / target_h as u64).max(1) as u32;
        (crop_w, feed_h)
    } else {
        let crop_h = ((feed_w as u64 * target_h as u64) / target_w as u64).max(1) as u32;
        (feed_w, crop_h)
    };

    let x = (feed_w - crop_w) / 2;
    let y = (feed_h - crop_h) / 2;

    let cropped = imageops::crop_imm(frame, x, y, crop_w, crop_h).to_image();
    imageops::resize(&cropped, target_w, target_h, imageops::FilterType::Triangle)
}

pub fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    frame.write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(width: u32, height: u32) -> RgbImage {
        RgbImage::new(width, height)
    }

    #[test]
    fn wider_feed_is_cropped_to_portrait_target() {
        let framed = crop_to_target(&feed(1600, 1200), Orientation::Portrait);
        assert_eq!(framed.dimensions(), (1080, 1920));
    }

    #[test]
    fn taller_feed_is_cropped_to_landscape_target() {
        let framed = crop_to_target(&feed(1200, 1600), Orientation::Landscape);
        assert_eq!(framed.dimensions(), (1920, 1080));
    }

    #[test]
    fn exact_ratio_feed_only_resizes() {
        let framed = crop_to_target(&feed(540, 960), Orientation::Portrait);
        assert_eq!(framed.dimensions(), (1080, 1920));
    }

    #[test]
    fn extreme_ratios_still_hit_target_dimensions() {
        for (w, h) in [(3840, 400), (400, 3840), (101, 97)] {
            let framed = crop_to_target(&feed(w, h), Orientation::Portrait);
            assert_eq!(framed.dimensions(), (1080, 1920), "feed {w}x{h}");
            let framed = crop_to_target(&feed(w, h), Orientation::Landscape);
            assert_eq!(framed.dimensions(), (1920, 1080), "feed {w}x{h}");
        }
    }

    #[test]
    fn jpeg_encoding_produces_nonempty_payload() {
        let bytes = encode_jpeg(&feed(64, 64)).unwrap();
        assert!(!bytes.is_empty());
    }
}
