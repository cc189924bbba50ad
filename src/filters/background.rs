use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use image::GrayImage;
use rayon::prelude::*;

use super::Transform;
use crate::{error::FilterError, types::Frame};

pub const FOREGROUND: u8 = 255;
pub const SHADOW: u8 = 127;
pub const BACKGROUND: u8 = 0;

#[derive(Clone, Debug)]
pub struct BackgroundConfig {
    /// Frames it takes to rotate every stored sample once.
    pub history: u32,
    /// Squared distance under which a stored sample matches a pixel.
    pub dist2_threshold: f32,
    /// Matching samples needed to call a pixel background.
    pub k_nearest: usize,
    /// Samples kept per pixel.
    pub samples: usize,
    pub detect_shadows: bool,
    /// Lowest brightness ratio still considered a shadow.
    pub shadow_threshold: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            history: 500,
            dist2_threshold: 400.0,
            k_nearest: 2,
            samples: 7,
            detect_shadows: true,
            shadow_threshold: 0.5,
        }
    }
}

impl BackgroundConfig {
    fn update_period(&self) -> u64 {
        let samples = self.samples.max(1) as u64;
        (u64::from(self.history) / samples).max(1)
    }
}

/// `(width, height, channels)` of the frames a model was seeded from.
type Shape = (u32, u32, usize);

struct KnnModel {
    /// Pixel-major: `samples` slots of `channels` bytes for every pixel.
    samples: Vec<u8>,
    next_slot: usize,
    frames_seen: u64,
}

impl KnnModel {
    fn seeded(data: &[u8], channels: usize, samples: usize) -> Self {
        let stride = samples * channels;
        let mut buf = vec![0u8; data.len() * samples];
        buf.par_chunks_mut(stride)
            .zip(data.par_chunks(channels))
            .for_each(|(slots, px)| {
                for slot in slots.chunks_exact_mut(channels) {
                    slot.copy_from_slice(px);
                }
            });

        Self {
            samples: buf,
            next_slot: 0,
            frames_seen: 1,
        }
    }
}

fn dist2(a: &[u8], b: &[u8]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f32::from(x) - f32::from(y);
            d * d
        })
        .sum()
}

/// A pixel is a shadow of a sample when it is a darker copy of it: same
/// chromaticity, brightness ratio between the shadow threshold and one.
fn is_shadow_of(px: &[u8], sample: &[u8], cfg: &BackgroundConfig) -> bool {
    let (mut dot, mut norm) = (0.0f32, 0.0f32);
    for (&p, &s) in px.iter().zip(sample) {
        dot += f32::from(p) * f32::from(s);
        norm += f32::from(s) * f32::from(s);
    }
    if norm <= f32::EPSILON {
        return false;
    }

    let ratio = dot / norm;
    if ratio < cfg.shadow_threshold || ratio > 1.0 {
        return false;
    }

    let residual: f32 = px
        .iter()
        .zip(sample)
        .map(|(&p, &s)| {
            let d = f32::from(p) - ratio * f32::from(s);
            d * d
        })
        .sum();
    residual < cfg.dist2_threshold * ratio * ratio
}

fn classify(px: &[u8], slots: &[u8], channels: usize, cfg: &BackgroundConfig) -> u8 {
    let k = cfg.k_nearest.max(1);
    let close = slots
        .chunks_exact(channels)
        .filter(|sample| dist2(px, sample) < cfg.dist2_threshold)
        .take(k)
        .count();
    if close >= k {
        return BACKGROUND;
    }

    if cfg.detect_shadows {
        let shadowed = slots
            .chunks_exact(channels)
            .filter(|sample| is_shadow_of(px, sample, cfg))
            .take(k)
            .count();
        if shadowed >= k {
            return SHADOW;
        }
    }

    FOREGROUND
}

/// Rolling per-pixel sample model in the spirit of KNN background
/// subtraction. Emits a gray mask: 255 foreground, 127 shadow, 0 background.
///
/// One model is kept per frame shape (size and channel count), so chains that
/// share an instance but feed it differently shaped frames (one with
/// Grayscale ahead of it, one without) do not evict each other. Chains
/// feeding the same shape share one model and see each other's frames.
pub struct KnnBackgroundSubtractor {
    cfg: BackgroundConfig,
    models: Mutex<HashMap<Shape, KnnModel>>,
}

impl KnnBackgroundSubtractor {
    pub fn new(cfg: BackgroundConfig) -> Self {
        Self {
            cfg,
            models: Mutex::new(HashMap::new()),
        }
    }

    pub fn reset(&self) {
        self.models
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn subtract(&self, data: &[u8], width: u32, height: u32, channels: usize) -> GrayImage {
        let samples = self.cfg.samples.max(1);
        let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(model) = models.get_mut(&(width, height, channels)) else {
            log::debug!("seeding background model at {width}x{height}x{channels}");
            models.insert(
                (width, height, channels),
                KnnModel::seeded(data, channels, samples),
            );
            return GrayImage::from_pixel(width, height, image::Luma([BACKGROUND]));
        };

        let stride = samples * channels;
        let mask: Vec<u8> = model
            .samples
            .par_chunks(stride)
            .zip(data.par_chunks(channels))
            .map(|(slots, px)| classify(px, slots, channels, &self.cfg))
            .collect();

        if model.frames_seen % self.cfg.update_period() == 0 {
            let slot = model.next_slot;
            model
                .samples
                .par_chunks_mut(stride)
                .zip(data.par_chunks(channels))
                .for_each(|(slots, px)| {
                    slots[slot * channels..(slot + 1) * channels].copy_from_slice(px);
                });
            model.next_slot = (slot + 1) % samples;
        }
        model.frames_seen += 1;

        GrayImage::from_raw(width, height, mask)
            .unwrap_or_else(|| GrayImage::new(width, height))
    }
}

impl Transform for KnnBackgroundSubtractor {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        if frame.is_empty() {
            return Ok(frame);
        }

        let (width, height) = frame.dimensions();
        let mask = match &frame {
            Frame::Gray(img) => self.subtract(img.as_raw(), width, height, 1),
            Frame::Color(img) => self.subtract(img.as_raw(), width, height, 3),
        };
        Ok(Frame::Gray(mask))
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::types::test_util::solid_frame;

    fn mask_of(frame: Frame) -> GrayImage {
        match frame {
            Frame::Gray(img) => img,
            Frame::Color(_) => panic!("expected a gray mask"),
        }
    }

    fn with_square(base: [u8; 3], square: [u8; 3]) -> Frame {
        Frame::Color(RgbImage::from_fn(32, 32, |x, y| {
            if (8..16).contains(&x) && (8..16).contains(&y) {
                Rgb(square)
            } else {
                Rgb(base)
            }
        }))
    }

    #[test]
    fn static_scene_is_background() {
        let subtractor = KnnBackgroundSubtractor::new(BackgroundConfig::default());
        for _ in 0..5 {
            let mask = mask_of(subtractor.apply(solid_frame(32, 32, [50, 60, 70])).unwrap());
            assert!(mask.pixels().all(|p| p.0[0] == BACKGROUND));
        }
    }

    #[test]
    fn changed_region_is_foreground() {
        let subtractor = KnnBackgroundSubtractor::new(BackgroundConfig::default());
        for _ in 0..3 {
            subtractor.apply(solid_frame(32, 32, [20, 20, 20])).unwrap();
        }

        let mask = mask_of(subtractor.apply(with_square([20, 20, 20], [230, 40, 40])).unwrap());
        assert_eq!(mask.get_pixel(10, 10).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(0, 0).0[0], BACKGROUND);
        assert_eq!(mask.get_pixel(31, 31).0[0], BACKGROUND);
    }

    #[test]
    fn darker_copy_is_a_shadow() {
        let subtractor = KnnBackgroundSubtractor::new(BackgroundConfig::default());
        subtractor.apply(solid_frame(32, 32, [200, 160, 120])).unwrap();

        let mask = mask_of(subtractor.apply(with_square([200, 160, 120], [140, 112, 84])).unwrap());
        assert_eq!(mask.get_pixel(12, 12).0[0], SHADOW);

        let no_shadows = KnnBackgroundSubtractor::new(BackgroundConfig {
            detect_shadows: false,
            ..BackgroundConfig::default()
        });
        no_shadows.apply(solid_frame(32, 32, [200, 160, 120])).unwrap();
        let mask = mask_of(no_shadows.apply(with_square([200, 160, 120], [140, 112, 84])).unwrap());
        assert_eq!(mask.get_pixel(12, 12).0[0], FOREGROUND);
    }

    #[test]
    fn model_absorbs_a_lasting_change() {
        let subtractor = KnnBackgroundSubtractor::new(BackgroundConfig {
            history: 7,
            ..BackgroundConfig::default()
        });
        subtractor.apply(solid_frame(16, 16, [0, 0, 0])).unwrap();

        let first = mask_of(subtractor.apply(solid_frame(16, 16, [255, 255, 255])).unwrap());
        assert!(first.pixels().all(|p| p.0[0] == FOREGROUND));

        for _ in 0..3 {
            subtractor.apply(solid_frame(16, 16, [255, 255, 255])).unwrap();
        }
        let later = mask_of(subtractor.apply(solid_frame(16, 16, [255, 255, 255])).unwrap());
        assert!(later.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn interleaved_shapes_keep_separate_models() {
        let subtractor = KnnBackgroundSubtractor::new(BackgroundConfig::default());
        let gray_scene = || Frame::Gray(GrayImage::from_pixel(32, 32, image::Luma([60])));

        for _ in 0..3 {
            subtractor.apply(solid_frame(32, 32, [20, 20, 20])).unwrap();
            subtractor.apply(gray_scene()).unwrap();
        }

        let color = mask_of(subtractor.apply(with_square([20, 20, 20], [230, 40, 40])).unwrap());
        assert_eq!(color.get_pixel(12, 12).0[0], FOREGROUND);
        assert_eq!(color.get_pixel(0, 0).0[0], BACKGROUND);

        let gray = mask_of(subtractor.apply(gray_scene()).unwrap());
        assert!(gray.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn shape_change_reseeds_model() {
        let subtractor = KnnBackgroundSubtractor::new(BackgroundConfig::default());
        subtractor.apply(solid_frame(16, 16, [0, 0, 0])).unwrap();

        let mask = mask_of(subtractor.apply(solid_frame(8, 4, [255, 255, 255])).unwrap());
        assert_eq!(mask.dimensions(), (8, 4));
        assert!(mask.pixels().all(|p| p.0[0] == BACKGROUND));
    }
}
