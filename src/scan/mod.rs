mod controller;
mod debounce;
mod loop_worker;
mod pipeline;
mod status;

pub use controller::ScanController;
pub use debounce::{Admission, DebounceGate};
pub use loop_worker::{scan_loop, ScanConfig};
pub use pipeline::{process_detection, ScanOutcome};
pub use status::{StatusBoard, StatusLine, IDLE_PROMPT};
