use anyhow::Result;

use super::{BoundingBox, Decoder, Detection, Frame};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_warn;

/// QR detector over luma8 frames, backed by quircs. A frame may contain any
/// number of codes; each decodes independently, and one unreadable code
/// (blurry, clipped, non-UTF-8) is skipped rather than failing the frame.
pub struct QuircDecoder {
    inner: quircs::Quirc,
}

impl QuircDecoder {
    pub fn new() -> Self {
        Self {
            inner: quircs::Quirc::default(),
        }
    }
}

impl Default for QuircDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for QuircDecoder {
    fn decode(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let codes = self.inner.identify(
            frame.width as usize,
            frame.height as usize,
            &frame.pixels,
        );

        let mut detections = Vec::new();
        for code in codes {
            let code = match code {
                Ok(code) => code,
                Err(err) => {
                    log_warn!("skipping unextractable code: {err}");
                    continue;
                }
            };

            let data = match code.decode() {
                Ok(data) => data,
                Err(err) => {
                    log_warn!("skipping undecodable code: {err}");
                    continue;
                }
            };

            let payload = match String::from_utf8(data.payload) {
                Ok(payload) => payload,
                Err(err) => {
                    log_warn!("skipping non-utf8 payload: {err}");
                    continue;
                }
            };

            let corners: Vec<(i32, i32)> = code
                .corners
                .iter()
                .map(|point| (point.x, point.y))
                .collect();

            detections.push(Detection {
                payload,
                bounds: BoundingBox::from_corners(&corners),
            });
        }

        Ok(detections)
    }
}
