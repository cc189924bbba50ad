pub mod camera;
pub mod frame_converter;

// Re-exports for convenience
pub use camera::{CameraDevice, CameraStream, available_cameras, start_camera_stream};
