use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::{
    edges::canny,
    gradients::{horizontal_sobel, vertical_sobel},
};

use super::Transform;
use crate::{error::FilterError, types::Frame};

const CANNY_LOW_THRESHOLD: f32 = 100.0;
const CANNY_HIGH_THRESHOLD: f32 = 200.0;

/// Per-channel `0.5 * |dx| + 0.5 * |dy|`, each term saturated to u8 first.
pub struct Sobel;

impl Sobel {
    fn plane(gray: &GrayImage) -> GrayImage {
        let dx = horizontal_sobel(gray);
        let dy = vertical_sobel(gray);
        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let gx = saturate_abs(dx.get_pixel(x, y).0[0]);
            let gy = saturate_abs(dy.get_pixel(x, y).0[0]);
            Luma([((gx + gy + 1) / 2) as u8])
        })
    }
}

fn saturate_abs(v: i16) -> u16 {
    v.unsigned_abs().min(255)
}

fn split_channels(img: &RgbImage) -> [GrayImage; 3] {
    std::array::from_fn(|c| {
        GrayImage::from_fn(img.width(), img.height(), |x, y| {
            Luma([img.get_pixel(x, y).0[c]])
        })
    })
}

fn merge_channels(planes: &[GrayImage; 3]) -> RgbImage {
    let (width, height) = planes[0].dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            planes[0].get_pixel(x, y).0[0],
            planes[1].get_pixel(x, y).0[0],
            planes[2].get_pixel(x, y).0[0],
        ])
    })
}

impl Transform for Sobel {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        if frame.is_empty() {
            return Ok(frame);
        }

        Ok(match frame {
            Frame::Gray(img) => Frame::Gray(Self::plane(&img)),
            Frame::Color(img) => {
                let planes = split_channels(&img).map(|plane| Self::plane(&plane));
                Frame::Color(merge_channels(&planes))
            }
        })
    }
}

/// Canny edge map over the luma image. Always yields a gray 0/255 frame.
pub struct CannyEdges {
    low: f32,
    high: f32,
}

impl Default for CannyEdges {
    fn default() -> Self {
        Self {
            low: CANNY_LOW_THRESHOLD,
            high: CANNY_HIGH_THRESHOLD,
        }
    }
}

impl Transform for CannyEdges {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        if frame.is_empty() {
            return Ok(frame);
        }

        let gray = match frame {
            Frame::Gray(img) => img,
            Frame::Color(img) => imageops::grayscale(&img),
        };
        Ok(Frame::Gray(canny(&gray, self.low, self.high)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_util::solid_frame;

    fn step_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            if x < width / 2 { Luma([0]) } else { Luma([255]) }
        })
    }

    #[test]
    fn sobel_is_flat_on_uniform_input() {
        let out = Sobel.apply(solid_frame(20, 20, [90, 90, 90])).unwrap();
        assert_eq!(out, solid_frame(20, 20, [0, 0, 0]));
    }

    #[test]
    fn sobel_responds_to_step() {
        let Frame::Gray(out) = Sobel.apply(Frame::Gray(step_image(20, 10))).unwrap() else {
            panic!("expected gray output");
        };
        assert!(out.get_pixel(10, 5).0[0] > 100);
        assert_eq!(out.get_pixel(2, 5).0[0], 0);
    }

    #[test]
    fn sobel_keeps_color_channels() {
        let out = Sobel.apply(solid_frame(8, 8, [1, 2, 3])).unwrap();
        assert_eq!(out.channels(), 3);
    }

    #[test]
    fn canny_yields_binary_gray_map() {
        let out = CannyEdges::default()
            .apply(Frame::Gray(step_image(40, 30)))
            .unwrap();
        let Frame::Gray(edges) = out else {
            panic!("expected gray output");
        };
        assert_eq!(edges.dimensions(), (40, 30));
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert!(edges.pixels().any(|p| p.0[0] == 255));
    }

    #[test]
    fn canny_finds_nothing_on_flat_color() {
        let out = CannyEdges::default()
            .apply(solid_frame(16, 16, [200, 10, 10]))
            .unwrap();
        assert_eq!(out.channels(), 1);
        let Frame::Gray(edges) = out else {
            panic!("expected gray output");
        };
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }
}
