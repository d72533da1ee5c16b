//! Interface to the optical marker locator/extractor.
//!
//! `imageframer` (the Python `Framer`) is an external, camera-facing
//! computer-vision collaborator -- finding printed corner markers in a
//! photographed frame, warping the photo back to a fronto-parallel view,
//! and burning fresh markers into a frame being transmitted. None of
//! that belongs in this crate (see spec.md Non-goals: no capture
//! pipeline, no camera rectification). `Framer` captures the shape of
//! the collaboration so `Transmitter`/`Receiver` can be written and
//! tested against it; [`PassthroughFramer`] is a deterministic stand-in
//! used by this crate's own round-trip tests, not a computer-vision
//! implementation.

use ndarray::Array2;

use crate::config::Shape;

/// Four corner points (in frame pixel coordinates) locating a marked
/// region, in an implementation-defined but consistent order.
pub type Corners = [(f64, f64); 4];

/// Per-frame locator hints an implementation may use to speed up or
/// stabilize marker search (e.g. the previous frame's corners).
pub type Hints = Vec<Corners>;

/// Collaborator responsible for marker placement, location and
/// rectification.
pub trait Framer {
    /// Finds the four marker corners in `frame`. Returns `Err` (never a
    /// panic) when no markers are found -- the receiver turns this into
    /// a `DecodeOutcome::NotFound`, not a propagating error.
    fn locate(&self, frame: &Array2<u8>, hints: Option<&mut Hints>) -> Result<Corners, String>;

    /// Extracts and rectifies the `shape`-sized code region bounded by
    /// `corners` out of `frame`.
    fn extract(&self, frame: &Array2<u8>, shape: Shape, corners: Corners, hints: Option<&mut Hints>) -> Array2<u8>;

    /// Burns fresh markers around `code`, producing a frame ready for
    /// display.
    fn add_markers(&self, code: &Array2<u8>) -> Array2<u8>;
}

/// A deterministic stand-in for a real camera-facing `Framer`: markers
/// are a fixed border of a known width rather than anything a camera
/// would need to locate, `locate` always succeeds at the frame's outer
/// edges, and `extract` simply crops that border back off. Useful for
/// exercising `Transmitter`/`Receiver` plumbing without a vision stack.
pub struct PassthroughFramer {
    border_pixels: usize,
}

impl PassthroughFramer {
    pub fn new(shape: Shape, border: f64) -> Self {
        let border_pixels = (shape.0.min(shape.1) as f64 * border) as usize;
        Self { border_pixels }
    }
}

impl Framer for PassthroughFramer {
    fn locate(&self, frame: &Array2<u8>, _hints: Option<&mut Hints>) -> Result<Corners, String> {
        let (h, w) = (frame.shape()[0] as f64, frame.shape()[1] as f64);
        let b = self.border_pixels as f64;
        if frame.shape()[0] <= 2 * self.border_pixels || frame.shape()[1] <= 2 * self.border_pixels {
            return Err("frame too small for border".to_string());
        }
        Ok([(b, b), (b, w - b), (h - b, w - b), (h - b, b)])
    }

    fn extract(&self, frame: &Array2<u8>, shape: Shape, _corners: Corners, _hints: Option<&mut Hints>) -> Array2<u8> {
        let b = self.border_pixels;
        frame
            .slice(ndarray::s![b..b + shape.0, b..b + shape.1])
            .to_owned()
    }

    fn add_markers(&self, code: &Array2<u8>) -> Array2<u8> {
        let (h, w) = (code.shape()[0], code.shape()[1]);
        let b = self.border_pixels;
        let mut framed = Array2::<u8>::zeros((h + 2 * b, w + 2 * b));
        framed.slice_mut(ndarray::s![b..b + h, b..b + w]).assign(code);
        framed
    }
}
