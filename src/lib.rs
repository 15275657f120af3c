//! QR-code attendance scanning: a continuous frame pipeline that decodes
//! identifier codes, resolves them against a subject registry, debounces
//! repeat sightings, and records presence exactly once per subject per day.

pub mod db;
pub mod decode;
pub mod models;
pub mod report;
pub mod scan;
mod utils;

pub use db::{Database, MarkOutcome};
pub use decode::{
    BoundingBox, CaptureDirSource, Decoder, Detection, Frame, FrameError, FrameSource,
    QuircDecoder,
};
pub use models::{AttendanceEntry, AttendanceRecord, ScanSession, ScanSessionStatus, Subject};
pub use report::{build_report, DailyReport};
pub use scan::{ScanConfig, ScanController, ScanOutcome, StatusLine};
