//! rollcall-store — Student registry and attendance persistence.
//!
//! SQLite behind an async connection actor. The attendance table's
//! UNIQUE(student_id, date) index backs the gate's at-most-once-per-day
//! commit as a single atomic conditional insert.

pub mod gate;
pub mod store;

pub use gate::{classify_remarks, default_late_cutoff, AttendanceGate, Remark};
pub use store::{
    AttendanceEntry, DashboardStats, NewStudent, Store, StoreError, StudentProfile,
    TodayAttendanceRow,
};
