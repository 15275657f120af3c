pub mod attendance;
pub mod scan_session;
pub mod subject;

pub use attendance::{AttendanceEntry, AttendanceRecord};
pub use scan_session::{ScanSession, ScanSessionStatus};
pub use subject::Subject;
