use image::RgbaImage;

use super::{Arc, ImageFrame, RenderImage};
use crate::types::Frame;

pub(super) fn frame_to_image(frame: &Frame) -> Arc<RenderImage> {
    // GPUI expects BGRA; convert here to avoid the async asset pipeline and flicker.
    let bgra = to_bgra(frame);
    Arc::new(RenderImage::new(vec![ImageFrame::new(bgra)]))
}

/// Display buffer for `frame` with red and blue swapped. Gray frames come out
/// as neutral gray.
fn to_bgra(frame: &Frame) -> RgbaImage {
    let mut rgba = frame.to_rgba();
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn color_frames_are_swapped_to_bgra() {
        let frame = Frame::Color(RgbImage::from_pixel(2, 1, Rgb([10, 20, 30])));
        let bgra = to_bgra(&frame);
        assert_eq!(bgra.dimensions(), (2, 1));
        assert_eq!(bgra.as_raw().as_slice(), &[30, 20, 10, 255, 30, 20, 10, 255]);
    }

    #[test]
    fn gray_frames_stay_neutral() {
        let frame = Frame::Gray(GrayImage::from_pixel(1, 2, Luma([77])));
        let bgra = to_bgra(&frame);
        assert!(bgra.pixels().all(|p| p.0 == [77, 77, 77, 255]));
    }
}
