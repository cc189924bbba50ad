use image::imageops::{self, FilterType};

use super::Transform;
use crate::{error::FilterError, types::Frame};

const PIXELATE_FACTOR: u32 = 10;

pub struct Grayscale;

impl Transform for Grayscale {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        if frame.is_empty() {
            return Ok(frame);
        }

        Ok(match frame {
            Frame::Color(img) => Frame::Gray(imageops::grayscale(&img)),
            gray @ Frame::Gray(_) => gray,
        })
    }
}

/// Mirrors rows top to bottom.
pub struct VerticalFlip;

impl Transform for VerticalFlip {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        Ok(match frame {
            Frame::Gray(mut img) => {
                imageops::flip_vertical_in_place(&mut img);
                Frame::Gray(img)
            }
            Frame::Color(mut img) => {
                imageops::flip_vertical_in_place(&mut img);
                Frame::Color(img)
            }
        })
    }
}

/// Mirrors columns left to right.
pub struct HorizontalFlip;

impl Transform for HorizontalFlip {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        Ok(match frame {
            Frame::Gray(mut img) => {
                imageops::flip_horizontal_in_place(&mut img);
                Frame::Gray(img)
            }
            Frame::Color(mut img) => {
                imageops::flip_horizontal_in_place(&mut img);
                Frame::Color(img)
            }
        })
    }
}

pub struct Negative;

impl Transform for Negative {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        Ok(match frame {
            Frame::Gray(mut img) => {
                img.iter_mut().for_each(|v| *v = !*v);
                Frame::Gray(img)
            }
            Frame::Color(mut img) => {
                img.iter_mut().for_each(|v| *v = !*v);
                Frame::Color(img)
            }
        })
    }
}

/// Swaps the first and third channel (RGB <-> BGR).
pub struct ChannelSwap;

impl Transform for ChannelSwap {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        Ok(match frame {
            Frame::Color(mut img) => {
                for px in img.pixels_mut() {
                    px.0.swap(0, 2);
                }
                Frame::Color(img)
            }
            gray @ Frame::Gray(_) => gray,
        })
    }
}

/// Linear downscale followed by a nearest-neighbour upscale back to the
/// original size.
pub struct Pixelate {
    factor: u32,
}

impl Default for Pixelate {
    fn default() -> Self {
        Self {
            factor: PIXELATE_FACTOR,
        }
    }
}

impl Pixelate {
    fn reduced_size(&self, width: u32, height: u32) -> (u32, u32) {
        let factor = self.factor.max(1);
        ((width / factor).max(1), (height / factor).max(1))
    }
}

impl Transform for Pixelate {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        if frame.is_empty() {
            return Ok(frame);
        }

        let (width, height) = frame.dimensions();
        let (w, h) = self.reduced_size(width, height);
        Ok(match frame {
            Frame::Gray(img) => {
                let reduced = imageops::resize(&img, w, h, FilterType::Triangle);
                Frame::Gray(imageops::resize(&reduced, width, height, FilterType::Nearest))
            }
            Frame::Color(img) => {
                let reduced = imageops::resize(&img, w, h, FilterType::Triangle);
                Frame::Color(imageops::resize(&reduced, width, height, FilterType::Nearest))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;
    use crate::types::test_util::{gradient_frame, gray_gradient_frame, solid_frame};

    #[test]
    fn grayscale_drops_to_one_channel() {
        let out = Grayscale.apply(gradient_frame(100, 100)).unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.dimensions(), (100, 100));

        let gray = gray_gradient_frame(10, 10);
        assert_eq!(Grayscale.apply(gray.clone()).unwrap(), gray);
    }

    #[test]
    fn grayscale_passes_zero_area_frames_through() {
        for (w, h) in [(0, 5), (5, 0), (0, 0)] {
            let frame = Frame::Color(RgbImage::new(w, h));
            assert_eq!(Grayscale.apply(frame.clone()).unwrap(), frame);
        }
    }

    #[test]
    fn flips_are_involutions() {
        let frame = gradient_frame(31, 17);
        let flips: [&dyn Transform; 2] = [&VerticalFlip, &HorizontalFlip];
        for flip in flips {
            let once = flip.apply(frame.clone()).unwrap();
            assert_ne!(once, frame);
            assert_eq!(flip.apply(once).unwrap(), frame);
        }
    }

    #[test]
    fn vertical_flip_moves_top_row_to_bottom() {
        let mut img = GrayImage::new(3, 4);
        img.put_pixel(1, 0, Luma([200]));
        let Frame::Gray(out) = VerticalFlip.apply(Frame::Gray(img)).unwrap() else {
            panic!("expected gray output");
        };
        assert_eq!(out.get_pixel(1, 3).0, [200]);
        assert_eq!(out.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn negative_inverts_samples() {
        let out = Negative.apply(solid_frame(2, 2, [0, 100, 255])).unwrap();
        assert_eq!(out, solid_frame(2, 2, [255, 155, 0]));
    }

    #[test]
    fn channel_swap_exchanges_red_and_blue() {
        let out = ChannelSwap.apply(solid_frame(3, 3, [10, 20, 30])).unwrap();
        assert_eq!(out, solid_frame(3, 3, [30, 20, 10]));

        let gray = gray_gradient_frame(5, 5);
        assert_eq!(ChannelSwap.apply(gray.clone()).unwrap(), gray);
    }

    #[test]
    fn pixelate_keeps_size_and_flat_regions() {
        let frame = solid_frame(64, 48, [40, 80, 120]);
        assert_eq!(Pixelate::default().apply(frame.clone()).unwrap(), frame);

        let out = Pixelate::default().apply(gradient_frame(64, 48)).unwrap();
        assert_eq!(out.dimensions(), (64, 48));
    }

    #[test]
    fn pixelate_produces_uniform_ten_pixel_blocks() {
        let frame = Frame::Color(RgbImage::from_fn(100, 100, |x, y| {
            Rgb([(x * 2) as u8, (y * 2) as u8, 90])
        }));
        let Frame::Color(out) = Pixelate::default().apply(frame).unwrap() else {
            panic!("expected color output");
        };
        assert_eq!(out.dimensions(), (100, 100));

        let block = |bx: u32, by: u32| *out.get_pixel(bx * 10, by * 10);
        for (x, y, px) in out.enumerate_pixels() {
            assert_eq!(*px, block(x / 10, y / 10), "pixel {x},{y} leaks out of its block");
        }
        for b in 0..9 {
            for other in 0..10 {
                assert_ne!(block(b, other), block(b + 1, other));
                assert_ne!(block(other, b), block(other, b + 1));
            }
        }
    }

    #[test]
    fn pixelate_handles_frames_smaller_than_factor() {
        let out = Pixelate::default().apply(gray_gradient_frame(4, 3)).unwrap();
        assert_eq!(out.dimensions(), (4, 3));
        let Frame::Gray(img) = out else {
            panic!("expected gray output");
        };
        let first = img.get_pixel(0, 0).0;
        assert!(img.pixels().all(|p| p.0 == first));
    }
}
