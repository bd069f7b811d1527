//! Frame conversions between the capture backend and the analyzer.

use image::RgbImage;
use opencv::core::Size;
use opencv::imgproc;
use opencv::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame backend: {0}")]
    Backend(#[from] opencv::Error),
    #[error("frame conversion failed: {0}")]
    Convert(String),
}

/// Downscale a frame by a uniform factor before detection. Detection
/// coordinates must be rescaled by the inverse before rendering.
pub fn downscale(frame: &Mat, factor: f64) -> Result<Mat, FrameError> {
    let mut out = Mat::default();
    imgproc::resize(
        frame,
        &mut out,
        Size::new(0, 0),
        factor,
        factor,
        imgproc::INTER_LINEAR,
    )?;
    Ok(out)
}

/// Convert a BGR capture frame into an `RgbImage` for the analyzer.
pub fn to_rgb_image(frame: &Mat) -> Result<RgbImage, FrameError> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb.data_bytes()?.to_vec();

    RgbImage::from_raw(width, height, data).ok_or_else(|| {
        FrameError::Convert(format!(
            "buffer does not fit {width}x{height} rgb dimensions"
        ))
    })
}
