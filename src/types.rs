use image::{GrayImage, RgbImage, RgbaImage, buffer::ConvertBuffer};

/// One captured or filtered picture.
///
/// Filters take frames by value and may hand back a different variant than
/// they received (a color frame can come back as a grayscale edge map), so
/// code downstream of a filter never assumes a channel count.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Frame {
    pub fn width(&self) -> u32 {
        match self {
            Frame::Gray(img) => img.width(),
            Frame::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Frame::Gray(img) => img.height(),
            Frame::Color(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn channels(&self) -> u8 {
        match self {
            Frame::Gray(_) => 1,
            Frame::Color(_) => 3,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Expands the frame to RGBA for display; gray samples are replicated.
    pub fn to_rgba(&self) -> RgbaImage {
        match self {
            Frame::Gray(img) => img.convert(),
            Frame::Color(img) => img.convert(),
        }
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        Frame::Gray(img)
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        Frame::Color(img)
    }
}

/// One tick of the frame source.
#[derive(Clone, Debug)]
pub enum SourceEvent {
    Frame(Frame),
    /// The camera produced nothing usable this tick; consumers skip it.
    Missed { reason: String },
}

#[cfg(test)]
pub(crate) mod test_util {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::Frame;

    /// A color frame whose pixels depend on their position, so flips and
    /// channel swaps are observable.
    pub fn gradient_frame(width: u32, height: u32) -> Frame {
        Frame::Color(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 7 % 256) as u8,
                (y * 13 % 256) as u8,
                ((x + y) * 3 % 256) as u8,
            ])
        }))
    }

    pub fn gray_gradient_frame(width: u32, height: u32) -> Frame {
        Frame::Gray(GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 5 + y * 11) % 256) as u8])
        }))
    }

    pub fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> Frame {
        Frame::Color(RgbImage::from_pixel(width, height, Rgb(color)))
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::{gradient_frame, gray_gradient_frame};

    #[test]
    fn reports_shape_of_both_variants() {
        let color = gradient_frame(40, 30);
        assert_eq!(color.dimensions(), (40, 30));
        assert_eq!(color.channels(), 3);

        let gray = gray_gradient_frame(16, 9);
        assert_eq!(gray.dimensions(), (16, 9));
        assert_eq!(gray.channels(), 1);
    }

    #[test]
    fn rgba_expansion_replicates_gray_samples() {
        let gray = gray_gradient_frame(4, 4);
        let rgba = gray.to_rgba();
        let super::Frame::Gray(src) = &gray else {
            unreachable!()
        };
        let value = src.get_pixel(3, 2).0[0];
        assert_eq!(rgba.get_pixel(3, 2).0, [value, value, value, 255]);
    }

    #[test]
    fn rgba_expansion_keeps_color_channels_opaque() {
        let color = gradient_frame(5, 3);
        let rgba = color.to_rgba();
        let super::Frame::Color(src) = &color else {
            unreachable!()
        };
        assert_eq!(rgba.dimensions(), (5, 3));
        for (x, y, px) in src.enumerate_pixels() {
            let [r, g, b] = px.0;
            assert_eq!(rgba.get_pixel(x, y).0, [r, g, b, 255]);
        }
    }
}
