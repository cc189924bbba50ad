use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::Sender;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::frame_converter;
use crate::{
    config::{CaptureConfig, FALLBACK_FPS},
    types::SourceEvent,
};

const REPORT_TIMEOUT: Duration = Duration::from_secs(1);

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        // Fall back to any format Nokhwa can decode, but prefer higher FPS to
        // avoid very low default rates (e.g. 15 FPS) that some drivers reject.
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

/// Handle to a running capture thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    resolution: (u32, u32),
    frame_rate: u32,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// False once the capture thread has exited, whether stopped or failed.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Native `(width, height)` the camera was opened with.
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Frames per second the capture thread is paced to.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info| CameraDevice {
            index: info.index().clone(),
            label: format_camera_label(&info),
        })
        .collect())
}

fn format_camera_label(info: &CameraInfo) -> String {
    info.human_name()
}

fn build_camera(index: CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Times one read after a warm-up read, for drivers that report no rate.
fn measure_frame_rate(camera: &mut Camera) -> Option<u32> {
    camera.frame().ok()?;
    let start = Instant::now();
    camera.frame().ok()?;
    let elapsed = start.elapsed().as_secs_f64();
    (elapsed > 0.0).then(|| (1.0 / elapsed).round() as u32)
}

/// Configured rate wins, then the driver's, then a measurement, then a
/// fixed fallback.
fn resolve_frame_rate<F>(target: Option<u32>, reported: u32, measure: F) -> u32
where
    F: FnOnce() -> Option<u32>,
{
    if let Some(fps) = target.filter(|fps| *fps > 0) {
        return fps;
    }
    if reported > 0 {
        return reported;
    }
    measure().filter(|fps| *fps > 0).unwrap_or(FALLBACK_FPS)
}

/// Clears the shared running flag when the capture thread exits.
struct RunningFlag(Arc<AtomicBool>);

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs `open` on the capture thread. A failure is logged and reported to the
/// UI as a missed tick, since no frame will follow.
fn open_or_report<T>(
    open: impl FnOnce() -> Result<T>,
    event_tx: &Sender<SourceEvent>,
) -> Option<T> {
    match open() {
        Ok(camera) => Some(camera),
        Err(err) => {
            log::error!("failed to open camera: {err:?}");
            let event = SourceEvent::Missed {
                reason: format!("camera could not be reopened: {err:#}"),
            };
            if event_tx.send_timeout(event, REPORT_TIMEOUT).is_err() {
                log::warn!("camera failure was not delivered to the UI");
            }
            None
        }
    }
}

/// Opens the camera and starts a capture thread that sends one
/// [`SourceEvent`] per tick. Events are dropped when the receiver lags.
pub fn start_camera_stream(
    index: CameraIndex,
    capture: &CaptureConfig,
    event_tx: Sender<SourceEvent>,
) -> Result<CameraStream> {
    // Fail fast before spawning the capture thread, and learn the format.
    let mut preflight = build_camera(index.clone())?;
    let native = preflight.resolution();
    let resolution = (native.width_x, native.height_y);
    let frame_rate = resolve_frame_rate(capture.target_fps, preflight.frame_rate(), || {
        measure_frame_rate(&mut preflight)
    });
    if let Err(err) = preflight.stop_stream() {
        log::warn!("failed to release preflight stream: {err:?}");
    }
    drop(preflight);

    log::info!(
        "camera opened at {}x{} paced to {frame_rate} fps",
        resolution.0,
        resolution.1
    );

    let stop = Arc::new(AtomicBool::new(false));
    let paused = Arc::new(AtomicBool::new(false));
    let running = Arc::new(AtomicBool::new(true));
    let stop_flag = stop.clone();
    let paused_flag = paused.clone();
    let running_flag = RunningFlag(running.clone());
    let interval = CaptureConfig::frame_interval(frame_rate);

    let handle = thread::spawn(move || {
        let _running = running_flag;
        let Some(mut camera) = open_or_report(|| build_camera(index), &event_tx) else {
            return;
        };

        while !stop_flag.load(Ordering::Relaxed) {
            let tick_start = Instant::now();

            if paused_flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                continue;
            }

            let event = match camera.frame() {
                Ok(buffer) => match frame_converter::convert_camera_frame(&buffer) {
                    Ok(frame) => SourceEvent::Frame(frame),
                    Err(err) => {
                        log::warn!("failed to decode camera frame {err:?}");
                        SourceEvent::Missed {
                            reason: format!("decode failed: {err:#}"),
                        }
                    }
                },
                Err(err) => {
                    log::warn!(
                        "camera frame read failed (after {:?}): {err:?}",
                        tick_start.elapsed()
                    );
                    SourceEvent::Missed {
                        reason: format!("read failed: {err}"),
                    }
                }
            };

            // Drop if the UI is busy, otherwise forward every tick.
            let _ = event_tx.try_send(event);

            let spent = tick_start.elapsed();
            if spent < interval {
                thread::sleep(interval - spent);
            }
        }

        if let Err(err) = camera.stop_stream() {
            log::debug!("failed to stop camera stream: {err:?}");
        }
    });

    Ok(CameraStream {
        stop,
        paused,
        running,
        resolution,
        frame_rate,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_reopen_reports_a_missed_tick() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let opened: Option<()> = open_or_report(|| Err(anyhow!("device busy")), &tx);
        assert!(opened.is_none());

        match rx.try_recv() {
            Ok(SourceEvent::Missed { reason }) => assert!(reason.contains("device busy")),
            other => panic!("expected a missed tick, got {other:?}"),
        }
    }

    #[test]
    fn successful_open_sends_nothing() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        assert_eq!(open_or_report(|| Ok(7), &tx), Some(7));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn running_flag_clears_when_thread_exits() {
        let running = Arc::new(AtomicBool::new(true));
        let flag = RunningFlag(running.clone());
        thread::spawn(move || {
            let _running = flag;
        })
        .join()
        .unwrap();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn configured_rate_wins() {
        assert_eq!(resolve_frame_rate(Some(12), 30, || Some(25)), 12);
    }

    #[test]
    fn driver_rate_is_used_when_reported() {
        assert_eq!(
            resolve_frame_rate(None, 30, || panic!("should not measure")),
            30
        );
    }

    #[test]
    fn measures_when_driver_reports_zero() {
        assert_eq!(resolve_frame_rate(None, 0, || Some(24)), 24);
        assert_eq!(resolve_frame_rate(None, 0, || None), FALLBACK_FPS);
        assert_eq!(resolve_frame_rate(Some(0), 0, || Some(0)), FALLBACK_FPS);
    }
}
