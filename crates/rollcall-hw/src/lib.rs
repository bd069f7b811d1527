//! rollcall-hw — Capture device and display surface.
//!
//! Wraps OpenCV's videoio/highgui backends behind small handles with RAII
//! release, plus frame conversion and annotation helpers.

pub mod camera;
pub mod draw;
pub mod frame;
pub mod window;

pub use camera::{Camera, CameraError};
pub use frame::FrameError;
pub use window::{Window, WindowError};
