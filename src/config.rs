use std::{env, path::PathBuf, time::Duration};

use crate::{
    filters::{background::BackgroundConfig, face::FaceDetectorConfig},
    model_download::default_face_model_path,
};

const CAMERA_ENV: &str = "WEBCAM_FILTERS_CAMERA";
const FPS_ENV: &str = "WEBCAM_FILTERS_FPS";
const FACE_MODEL_ENV: &str = "WEBCAM_FILTERS_FACE_MODEL";

// Used when neither the driver nor a measurement yields a usable rate.
pub const FALLBACK_FPS: u32 = 30;
const MAX_FPS: u32 = 240;

#[derive(Clone, Debug, Default)]
pub struct CaptureConfig {
    /// Index into the enumerated camera list; `None` lets the user pick.
    pub camera: Option<usize>,
    /// Overrides the driver-reported frame rate.
    pub target_fps: Option<u32>,
}

impl CaptureConfig {
    pub fn frame_interval(fps: u32) -> Duration {
        Duration::from_millis(1_000 / u64::from(fps.clamp(1, MAX_FPS)))
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub face_model_path: PathBuf,
    pub face: FaceDetectorConfig,
    pub background: BackgroundConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            face_model_path: default_face_model_path(),
            face: FaceDetectorConfig::default(),
            background: BackgroundConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overridden by `WEBCAM_FILTERS_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(CAMERA_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(idx) => self.capture.camera = Some(idx),
                Err(err) => log::warn!("ignoring {CAMERA_ENV}={raw:?}: {err}"),
            }
        }

        if let Some(raw) = lookup(FPS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(fps) if (1..=MAX_FPS).contains(&fps) => self.capture.target_fps = Some(fps),
                Ok(fps) => log::warn!("ignoring {FPS_ENV}={fps}: expected 1..={MAX_FPS}"),
                Err(err) => log::warn!("ignoring {FPS_ENV}={raw:?}: {err}"),
            }
        }

        if let Some(raw) = lookup(FACE_MODEL_ENV) {
            if !raw.trim().is_empty() {
                self.face_model_path = PathBuf::from(raw.trim());
            }
        }
    }
}
