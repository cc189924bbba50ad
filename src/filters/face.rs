use std::{
    cmp::Ordering,
    path::Path,
    sync::{Mutex, PoisonError},
};

use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use image::{Luma, Rgb, RgbImage, buffer::ConvertBuffer};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{FilterId, Transform};
use crate::{error::FilterError, types::Frame};

const INPUT_WIDTH: u32 = 320;
const INPUT_HEIGHT: u32 = 240;
const PIXEL_MEAN: f32 = 127.0;
const PIXEL_SCALE: f32 = 128.0;
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const GRAY_BOX_COLOR: Luma<u8> = Luma([255]);

#[derive(Clone, Debug)]
pub struct FaceDetectorConfig {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
}

impl Default for FaceDetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            nms_threshold: 0.3,
            top_k: 64,
        }
    }
}

/// Face box in frame pixels, corners inclusive of `x1,y1`, exclusive of
/// `x2,y2`.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceBox {
    pub bbox: [f32; 4],
    pub score: f32,
}

/// Draws a box around every face found by an UltraFace-style ONNX detector.
///
/// The session is loaded once; when it cannot be loaded frames pass through
/// untouched. Inference is serialized through a mutex.
pub struct FaceDetector {
    session: Option<Mutex<Session>>,
    cfg: FaceDetectorConfig,
}

impl FaceDetector {
    pub fn load(model_path: &Path, cfg: FaceDetectorConfig) -> Self {
        if !model_path.exists() {
            log::warn!(
                "face model not found at {}, face detection disabled",
                model_path.display()
            );
            return Self { session: None, cfg };
        }

        match Self::build_session(model_path) {
            Ok(session) => {
                log::info!("face detector ready using {}", model_path.display());
                Self {
                    session: Some(Mutex::new(session)),
                    cfg,
                }
            }
            Err(err) => {
                log::error!("failed to load face detector: {err:?}");
                Self { session: None, cfg }
            }
        }
    }

    fn build_session(model_path: &Path) -> Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load face detector from {}", model_path.display()))?;
        Ok(session)
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    fn detect(&self, session: &Mutex<Session>, rgb: &RgbImage) -> Result<Vec<FaceBox>> {
        let input = prepare_input(rgb)?;
        let tensor = Tensor::from_array(input)?;

        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![tensor])
            .context("failed to run face detector session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "face detector returned {} outputs, expected 2",
                outputs.len()
            ));
        }

        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let (scores, boxes) = if first.shape().last() == Some(&2) {
            (first, second)
        } else {
            (second, first)
        };

        let scores: Vec<f32> = scores.iter().copied().collect();
        let boxes: Vec<f32> = boxes.iter().copied().collect();
        decode_detections(&scores, &boxes, rgb.width(), rgb.height(), &self.cfg)
    }
}

fn prepare_input(rgb: &RgbImage) -> Result<Array4<f32>> {
    let src_image = fir::images::Image::from_vec_u8(
        rgb.width(),
        rgb.height(),
        rgb.as_raw().clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(INPUT_WIDTH, INPUT_HEIGHT, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let width = INPUT_WIDTH as usize;
    Ok(Array4::from_shape_fn(
        (1, 3, INPUT_HEIGHT as usize, width),
        |(_, c, y, x)| (f32::from(resized[(y * width + x) * 3 + c]) - PIXEL_MEAN) / PIXEL_SCALE,
    ))
}

/// Turns raw `[anchors, 2]` class scores and `[anchors, 4]` normalized
/// corner boxes into frame-space detections.
fn decode_detections(
    scores: &[f32],
    boxes: &[f32],
    width: u32,
    height: u32,
    cfg: &FaceDetectorConfig,
) -> Result<Vec<FaceBox>> {
    let anchors = scores.len() / 2;
    if boxes.len() / 4 != anchors {
        return Err(anyhow!(
            "anchor count mismatch between scores ({anchors}) and boxes ({})",
            boxes.len() / 4
        ));
    }

    let (w, h) = (width as f32, height as f32);
    let candidates: Vec<FaceBox> = scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= cfg.score_threshold)
        .filter_map(|(score, b)| {
            let x1 = (b[0] * w).clamp(0.0, w);
            let y1 = (b[1] * h).clamp(0.0, h);
            let x2 = (b[2] * w).clamp(0.0, w);
            let y2 = (b[3] * h).clamp(0.0, h);
            (x2 > x1 && y2 > y1).then_some(FaceBox {
                bbox: [x1, y1, x2, y2],
                score: score[1],
            })
        })
        .collect();

    let kept = nms(&candidates, cfg.nms_threshold, cfg.top_k);
    Ok(kept.into_iter().map(|idx| candidates[idx].clone()).collect())
}

fn nms(candidates: &[FaceBox], threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| {
        candidates[*b]
            .score
            .partial_cmp(&candidates[*a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    'outer: for &idx in &order {
        for &k in &keep {
            if iou(&candidates[idx].bbox, &candidates[k].bbox) >= threshold {
                continue 'outer;
            }
        }
        keep.push(idx);
        if keep.len() >= top_k {
            break;
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

fn face_rect(face: &FaceBox) -> Option<Rect> {
    let [x1, y1, x2, y2] = face.bbox;
    let w = (x2 - x1).round() as u32;
    let h = (y2 - y1).round() as u32;
    (w > 0 && h > 0).then(|| Rect::at(x1.round() as i32, y1.round() as i32).of_size(w, h))
}

fn gray_to_rgb(gray: &image::GrayImage) -> RgbImage {
    gray.convert()
}

impl Transform for FaceDetector {
    fn apply(&self, frame: Frame) -> Result<Frame, FilterError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(frame);
        };
        if frame.is_empty() {
            return Ok(frame);
        }

        let inference_error = |err: anyhow::Error| FilterError::Inference {
            filter: FilterId::FaceDetection.label(),
            message: format!("{err:#}"),
        };

        Ok(match frame {
            Frame::Color(mut img) => {
                let faces = self.detect(session, &img).map_err(inference_error)?;
                for rect in faces.iter().filter_map(face_rect) {
                    draw_hollow_rect_mut(&mut img, rect, BOX_COLOR);
                }
                Frame::Color(img)
            }
            Frame::Gray(mut img) => {
                let faces = self
                    .detect(session, &gray_to_rgb(&img))
                    .map_err(inference_error)?;
                for rect in faces.iter().filter_map(face_rect) {
                    draw_hollow_rect_mut(&mut img, rect, GRAY_BOX_COLOR);
                }
                Frame::Gray(img)
            }
        })
    }
}
