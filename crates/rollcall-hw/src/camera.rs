//! Webcam capture via OpenCV's videoio backend.

use opencv::prelude::*;
use opencv::videoio;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("no capture device at index {0}")]
    DeviceNotFound(i32),
    #[error("capture backend: {0}")]
    Backend(#[from] opencv::Error),
}

/// An open capture device.
///
/// The device is released on drop, so every exit path from the caller
/// gives it back. A failed `open` never produces a handle to release.
pub struct Camera {
    inner: videoio::VideoCapture,
    pub index: i32,
}

impl Camera {
    /// Open the capture device at the given index.
    pub fn open(index: i32) -> Result<Self, CameraError> {
        let inner = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        if !inner.is_opened()? {
            return Err(CameraError::DeviceNotFound(index));
        }
        tracing::info!(index, "camera opened");
        Ok(Self { inner, index })
    }

    /// Read one frame. `Ok(None)` is a transient miss — callers skip the
    /// iteration and try again next tick.
    pub fn read_frame(&mut self) -> Result<Option<Mat>, CameraError> {
        let mut frame = Mat::default();
        let grabbed = self.inner.read(&mut frame)?;
        if !grabbed || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(err) = self.inner.release() {
            tracing::warn!(index = self.index, error = %err, "camera release failed");
        } else {
            tracing::debug!(index = self.index, "camera released");
        }
    }
}
