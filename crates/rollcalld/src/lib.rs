//! rollcalld — Attendance daemon internals.
//!
//! Wires the descriptor gallery, matcher, registry, and attendance gate
//! into a per-frame pipeline, and runs strictly-ordered streaming
//! sessions over it. Transport framing stays outside; the shipped
//! binary serves one session over stdio.

pub mod config;
pub mod enroll;
pub mod oracle_cmd;
pub mod pipeline;
pub mod session;

pub use config::Config;
pub use oracle_cmd::CommandOracle;
pub use pipeline::{FaceResult, FrameResponse, Pipeline};
