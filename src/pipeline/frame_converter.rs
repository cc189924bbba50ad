use anyhow::{Result, anyhow};
use image::{GrayImage, RgbImage};
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgb, yuyv422_to_rgb,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

use crate::types::Frame;

/// Decodes a raw camera buffer. Gray cameras yield single-channel frames,
/// everything else is converted to 8-bit RGB.
pub fn convert_camera_frame(frame: &Buffer) -> Result<Frame> {
    let resolution = frame.resolution();
    let width = resolution.width_x;
    let height = resolution.height_y;
    let data = frame.buffer();

    match frame.source_frame_format() {
        FrameFormat::NV12 => rgb_frame(nv12_to_rgb(data, width, height)?, width, height),
        FrameFormat::YUYV => rgb_frame(yuyv_to_rgb(data, width, height)?, width, height),
        FrameFormat::MJPEG => {
            let (rgb, w, h) = mjpeg_to_rgb(data)?;
            rgb_frame(rgb, w, h)
        }
        FrameFormat::RAWRGB => rgb_frame(packed_rgb(data, width, height, false)?, width, height),
        FrameFormat::RAWBGR => rgb_frame(packed_rgb(data, width, height, true)?, width, height),
        FrameFormat::GRAY => gray_frame(data, width, height),
    }
}

fn ensure_area(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(anyhow!("camera delivered an empty {width}x{height} buffer"));
    }
    Ok(())
}

fn rgb_frame(rgb: Vec<u8>, width: u32, height: u32) -> Result<Frame> {
    ensure_area(width, height)?;
    RgbImage::from_raw(width, height, rgb)
        .map(Frame::Color)
        .ok_or_else(|| anyhow!("RGB buffer does not match {width}x{height}"))
}

fn gray_frame(data: &[u8], width: u32, height: u32) -> Result<Frame> {
    ensure_area(width, height)?;
    let expected_len = width as usize * height as usize;
    if data.len() < expected_len {
        return Err(anyhow!(
            "GRAY buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    GrayImage::from_raw(width, height, data[..expected_len].to_vec())
        .map(Frame::Gray)
        .ok_or_else(|| anyhow!("GRAY buffer does not match {width}x{height}"))
}

fn nv12_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;

    if data.len() < y_plane_len + uv_plane_len {
        return Err(anyhow!(
            "NV12 buffer too small: got {}, expected {}",
            data.len(),
            y_plane_len + uv_plane_len
        ));
    }

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgb = vec![0u8; y_plane_len * 3];
    yuv_nv12_to_rgb(
        &image,
        &mut rgb,
        width * 3,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGB failed: {err:?}"))?;

    Ok(rgb)
}

fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 2;
    if data.len() < expected_len {
        return Err(anyhow!(
            "YUYV buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    yuyv422_to_rgb(
        &packed,
        &mut rgb,
        width * 3,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422→RGB failed: {err:?}"))?;

    Ok(rgb)
}

fn mjpeg_to_rgb(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgb = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder reported no image info"))?;
    let width = u32::try_from(info.width).map_err(|_| anyhow!("MJPEG width does not fit u32"))?;
    let height =
        u32::try_from(info.height).map_err(|_| anyhow!("MJPEG height does not fit u32"))?;
    let expected_len = width as usize * height as usize * 3;
    if rgb.len() < expected_len {
        return Err(anyhow!(
            "MJPEG decode produced too few bytes: got {}, expected {}",
            rgb.len(),
            expected_len
        ));
    }

    Ok((rgb, width, height))
}

/// Copies tightly packed 3-byte pixels, optionally swapping red and blue.
fn packed_rgb(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 3;
    if data.len() < expected_len {
        return Err(anyhow!(
            "RGB buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let mut rgb = data[..expected_len].to_vec();
    if swap_rb {
        rgb.par_chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_input_is_swapped_to_rgb() {
        let bgr = [1, 2, 3, 4, 5, 6];
        assert_eq!(packed_rgb(&bgr, 2, 1, true).unwrap(), [3, 2, 1, 6, 5, 4]);
        assert_eq!(packed_rgb(&bgr, 2, 1, false).unwrap(), bgr);
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(packed_rgb(&[0; 5], 2, 1, false).is_err());
        assert!(gray_frame(&[0; 3], 2, 2).is_err());
        assert!(yuyv_to_rgb(&[0; 7], 2, 2).is_err());
        assert!(nv12_to_rgb(&[0; 5], 2, 2).is_err());
    }

    #[test]
    fn zero_area_buffers_are_rejected() {
        assert!(rgb_frame(Vec::new(), 0, 5).is_err());
        assert!(rgb_frame(Vec::new(), 5, 0).is_err());
        assert!(gray_frame(&[], 0, 5).is_err());
        assert!(gray_frame(&[1, 2, 3], 3, 0).is_err());
    }

    #[test]
    fn gray_buffers_stay_single_channel() {
        let frame = gray_frame(&[10, 20, 30, 40, 99], 2, 2).unwrap();
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.dimensions(), (2, 2));
    }
}
