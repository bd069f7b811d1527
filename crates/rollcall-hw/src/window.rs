//! Display window via OpenCV's highgui backend.

use opencv::highgui;
use opencv::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("display backend: {0}")]
    Backend(#[from] opencv::Error),
}

/// A named output window for annotated frames.
pub struct Window {
    name: String,
}

impl Window {
    pub fn open(name: &str) -> Result<Self, WindowError> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn show(&self, frame: &Mat) -> Result<(), WindowError> {
        highgui::imshow(&self.name, frame)?;
        Ok(())
    }

    /// Pump the event loop and return any pressed key.
    ///
    /// This also drives window repainting, so it must be called once per
    /// shown frame even when the key is not interesting.
    pub fn poll_key(&self) -> Result<Option<char>, WindowError> {
        let code = highgui::wait_key(1)?;
        if code < 0 {
            return Ok(None);
        }
        // Some backends set modifier bits above the low byte.
        Ok(char::from_u32((code & 0xFF) as u32))
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_window(&self.name) {
            tracing::debug!(window = %self.name, error = %err, "window destroy failed");
        }
    }
}
