use std::path::PathBuf;

use chrono::NaiveTime;
use rollcall_core::matcher::DEFAULT_MATCH_THRESHOLD;

/// Fixed linear downsample applied to every frame before detection.
pub const DEFAULT_FRAME_SCALE: f32 = 0.25;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Directory of enrollment images, one file per student id.
    pub faces_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Linear scale factor applied before face detection.
    pub frame_scale: f32,
    /// Check-ins strictly after this time are classified Late.
    pub late_cutoff: NaiveTime,
    /// External face-detection/encoding helper command.
    pub oracle_cmd: Option<String>,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.db"));

        Self {
            faces_dir: std::env::var("ROLLCALL_FACES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("faces")),
            db_path,
            match_threshold: env_f32("ROLLCALL_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            frame_scale: env_f32("ROLLCALL_FRAME_SCALE", DEFAULT_FRAME_SCALE),
            late_cutoff: env_time(
                "ROLLCALL_LATE_CUTOFF",
                rollcall_store::default_late_cutoff(),
            ),
            oracle_cmd: std::env::var("ROLLCALL_ORACLE_CMD").ok(),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_time(key: &str, default: NaiveTime) -> NaiveTime {
    std::env::var(key)
        .ok()
        .and_then(|v| NaiveTime::parse_from_str(&v, "%H:%M:%S").ok())
        .unwrap_or(default)
}
