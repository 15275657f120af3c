mod capture_dir;
mod quirc;

pub use capture_dir::CaptureDirSource;
pub use quirc::QuircDecoder;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One grayscale camera frame, 8-bit luma, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Axis-aligned box around a detected code, in frame pixel coordinates.
/// Carried for any overlay consumer; the core never draws it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn from_corners(corners: &[(i32, i32)]) -> Self {
        let min_x = corners.iter().map(|&(x, _)| x).min().unwrap_or(0);
        let max_x = corners.iter().map(|&(x, _)| x).max().unwrap_or(0);
        let min_y = corners.iter().map(|&(_, y)| y).min().unwrap_or(0);
        let max_y = corners.iter().map(|&(_, y)| y).max().unwrap_or(0);

        Self {
            x: min_x,
            y: min_y,
            w: (max_x - min_x).max(0) as u32,
            h: (max_y - min_y).max(0) as u32,
        }
    }
}

/// A code found in one frame. Transient: produced fresh per frame and
/// discarded after the loop iteration that processed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub payload: String,
    pub bounds: BoundingBox,
}

/// Turns one frame into the codes visible in it. Finite, possibly empty,
/// never blocks beyond the session's per-frame timeout.
pub trait Decoder: Send {
    fn decode(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// Why a frame read produced nothing usable.
#[derive(Debug)]
pub enum FrameError {
    /// One bad read. Retried silently; only a consecutive run of these
    /// exhausts the session's retry budget.
    Transient(anyhow::Error),
    /// The device is gone. Terminal for the session, recovered only by
    /// restarting it.
    Unavailable(anyhow::Error),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Transient(err) => write!(f, "transient frame error: {err}"),
            FrameError::Unavailable(err) => write!(f, "frame source unavailable: {err}"),
        }
    }
}

/// Blocking frame acquisition. `Ok(None)` means no new frame was ready this
/// tick, which is not an error and does not count against the retry budget.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;
}

#[cfg(test)]
mod tests {
    use super::BoundingBox;

    #[test]
    fn bounding_box_spans_corner_extremes() {
        let bounds = BoundingBox::from_corners(&[(10, 40), (90, 35), (95, 110), (8, 105)]);
        assert_eq!(bounds.x, 8);
        assert_eq!(bounds.y, 35);
        assert_eq!(bounds.w, 87);
        assert_eq!(bounds.h, 75);
    }

    #[test]
    fn degenerate_corners_yield_empty_box() {
        let bounds = BoundingBox::from_corners(&[(5, 5), (5, 5), (5, 5), (5, 5)]);
        assert_eq!(bounds.w, 0);
        assert_eq!(bounds.h, 0);
    }
}
