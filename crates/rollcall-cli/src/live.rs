//! Live recognition loop: capture, detect, match, annotate, present.

use anyhow::Result;
use opencv::core::Rect;
use opencv::prelude::*;

use rollcall_core::{FaceAnalyzer, FaceBox, FirstAcceptableMatcher, KnownFaceRegistry, Matcher};
use rollcall_hw::{draw, frame, Camera, Window};

const WINDOW_TITLE: &str = "Rollcall";
const STOP_KEY: char = 'q';

pub struct LiveOptions {
    pub camera_index: i32,
    pub tolerance: f32,
    pub resize_factor: f64,
}

/// Run the recognition loop until the stop key is pressed.
///
/// Camera-open failure aborts before the first iteration. Inside the loop
/// every per-frame problem is logged and skipped; the stop key is the only
/// terminal transition. The capture device and window release on drop, on
/// every exit path.
pub fn run<A: FaceAnalyzer>(
    mut analyzer: A,
    registry: KnownFaceRegistry,
    options: LiveOptions,
) -> Result<()> {
    let mut camera = Camera::open(options.camera_index)?;
    let window = Window::open(WINDOW_TITLE)?;
    let matcher = FirstAcceptableMatcher;

    tracing::info!(
        known = registry.len(),
        tolerance = options.tolerance,
        "live recognition started; press '{STOP_KEY}' to quit"
    );

    loop {
        let mut frame = match camera.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "frame acquisition failed; skipping");
                continue;
            }
        };

        if let Err(err) = process_frame(&mut analyzer, &matcher, &registry, &mut frame, &options) {
            tracing::warn!(error = %err, "frame processing failed; skipping");
        }

        window.show(&frame)?;
        if window.poll_key()? == Some(STOP_KEY) {
            tracing::info!("stop key received; leaving live loop");
            break;
        }
    }

    Ok(())
}

/// Detect and label every face in one frame, drawing onto it in place.
fn process_frame<A: FaceAnalyzer>(
    analyzer: &mut A,
    matcher: &FirstAcceptableMatcher,
    registry: &KnownFaceRegistry,
    frame: &mut Mat,
    options: &LiveOptions,
) -> Result<()> {
    // Detection runs on a downscaled copy; boxes are rescaled back onto
    // the original frame for rendering.
    let (rgb, upscale) = if options.resize_factor < 1.0 {
        let small = frame::downscale(frame, options.resize_factor)?;
        (frame::to_rgb_image(&small)?, (1.0 / options.resize_factor) as f32)
    } else {
        (frame::to_rgb_image(frame)?, 1.0)
    };

    for face in analyzer.analyze(&rgb)? {
        let result = matcher.find_match(&face.embedding, registry.entries(), options.tolerance);
        let rect = face_rect(&face.face_box.scaled(upscale), frame.cols(), frame.rows());
        draw::annotate_face(frame, rect, result.label())?;
    }

    Ok(())
}

/// Integer pixel rect clamped inside the frame.
fn face_rect(face: &FaceBox, frame_width: i32, frame_height: i32) -> Rect {
    let x = (face.x.round() as i32).clamp(0, frame_width - 1);
    let y = (face.y.round() as i32).clamp(0, frame_height - 1);
    let width = (face.width.round() as i32).clamp(1, frame_width - x);
    let height = (face.height.round() as i32).clamp(1, frame_height - y);
    Rect::new(x, y, width, height)
}
