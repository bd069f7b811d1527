//! Annotation rendering onto capture frames.

use opencv::core::{Point, Rect, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

use crate::frame::FrameError;

const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f64 = 0.5;
const LABEL_OFFSET: i32 = 10;

fn box_color() -> Scalar {
    // Green, BGR order.
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn label_color() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

/// Draw a face box and its name label onto the frame.
pub fn annotate_face(frame: &mut Mat, rect: Rect, label: &str) -> Result<(), FrameError> {
    imgproc::rectangle(frame, rect, box_color(), BOX_THICKNESS, imgproc::LINE_8, 0)?;

    // Label sits just above the box, clamped inside the frame.
    let origin = Point::new(rect.x, (rect.y - LABEL_OFFSET).max(LABEL_OFFSET));
    imgproc::put_text(
        frame,
        label,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        label_color(),
        1,
        imgproc::LINE_8,
        false,
    )?;

    Ok(())
}
