//! Async SQLite access for students and attendance.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::OptionalExtension;
use serde::Serialize;
use thiserror::Error;

use crate::gate::{classify_remarks, Remark};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    program         TEXT NOT NULL,
    section         TEXT NOT NULL,
    email           TEXT NOT NULL,
    phone           TEXT NOT NULL,
    admission_date  TEXT NOT NULL,
    photo_url       TEXT
);

CREATE TABLE IF NOT EXISTS attendance (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id     TEXT NOT NULL REFERENCES students(id),
    date           TEXT NOT NULL,
    check_in_time  TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'Present'
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_student_date
    ON attendance (student_id, date);
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("student {0} already exists")]
    DuplicateStudent(String),
}

/// Registered student profile, as served to the streaming caller.
#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    pub program: String,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub admission_date: NaiveDate,
    pub photo_url: Option<String>,
}

/// Fields for registering a new student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub id: String,
    pub name: String,
    pub program: String,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub admission_date: NaiveDate,
    pub photo_url: Option<String>,
}

/// One row of a student's attendance history.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEntry {
    pub date: NaiveDate,
    pub check_in_time: NaiveTime,
    pub status: String,
}

/// One row of today's attendance listing, joined with the registry.
#[derive(Debug, Clone, Serialize)]
pub struct TodayAttendanceRow {
    pub student_id: String,
    pub name: String,
    pub program: String,
    pub section: String,
    pub photo_url: Option<String>,
    pub check_in_time: NaiveTime,
    pub status: String,
    pub remarks: Remark,
}

/// Dashboard counters: total roster, present today, absent today.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
}

/// Handle to the SQLite connection actor. Cheap to clone; all clones
/// share one serialized connection.
#[derive(Clone)]
pub struct Store {
    conn: tokio_rusqlite::Connection,
}

impl Store {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open(path.as_ref().to_owned()).await?;
        Self::init(conn).await
    }

    /// In-memory database, for tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: tokio_rusqlite::Connection) -> Result<Self, StoreError> {
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }

    /// Register a new student. The id must not already exist.
    pub async fn add_student(&self, student: NewStudent) -> Result<(), StoreError> {
        let id = student.id.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO students
                         (id, name, program, section, email, phone, admission_date, photo_url)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        student.id,
                        student.name,
                        student.program,
                        student.section,
                        student.email,
                        student.phone,
                        student.admission_date,
                        student.photo_url,
                    ],
                )?;
                Ok(n)
            })
            .await?;
        if inserted == 0 {
            return Err(StoreError::DuplicateStudent(id));
        }
        Ok(())
    }

    /// Fetch one student by id, or `None` when unregistered.
    pub async fn student(&self, id: &str) -> Result<Option<StudentProfile>, StoreError> {
        let id = id.to_owned();
        let profile = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, name, program, section, email, phone, admission_date, photo_url
                         FROM students WHERE id = ?1",
                        [&id],
                        row_to_profile,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        Ok(profile)
    }

    /// Full roster, ordered by id.
    pub async fn all_students(&self) -> Result<Vec<StudentProfile>, StoreError> {
        let students = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, program, section, email, phone, admission_date, photo_url
                     FROM students ORDER BY id",
                )?;
                let rows = stmt
                    .query_map([], row_to_profile)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(students)
    }

    /// Whether a Present record exists for (student, date). Pure read.
    pub async fn attendance_exists(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let student_id = student_id.to_owned();
        let exists = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(
                         SELECT 1 FROM attendance WHERE student_id = ?1 AND date = ?2)",
                    rusqlite::params![student_id, date],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    /// Conditionally insert the day's attendance record.
    ///
    /// A single `INSERT OR IGNORE` against the UNIQUE(student_id, date)
    /// index: returns true iff this call created the row, so N racing
    /// calls yield exactly one true and one persisted record.
    pub async fn insert_attendance(
        &self,
        student_id: &str,
        date: NaiveDate,
        check_in_time: NaiveTime,
    ) -> Result<bool, StoreError> {
        let student_id = student_id.to_owned();
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO attendance (student_id, date, check_in_time, status)
                     VALUES (?1, ?2, ?3, 'Present')",
                    rusqlite::params![student_id, date, check_in_time],
                )?;
                Ok(n == 1)
            })
            .await?;
        Ok(inserted)
    }

    /// Attendance joined with the registry for one day, newest check-in
    /// first. Remarks are derived from the stored check-in time at read
    /// time, never stored.
    pub async fn today_attendance(
        &self,
        date: NaiveDate,
        late_cutoff: NaiveTime,
    ) -> Result<Vec<TodayAttendanceRow>, StoreError> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.id, s.name, s.program, s.section, s.photo_url,
                            a.check_in_time, a.status
                     FROM attendance a
                     JOIN students s ON a.student_id = s.id
                     WHERE a.date = ?1
                     ORDER BY a.check_in_time DESC",
                )?;
                let rows = stmt
                    .query_map([date], |row| {
                        let check_in_time: NaiveTime = row.get(5)?;
                        Ok(TodayAttendanceRow {
                            student_id: row.get(0)?,
                            name: row.get(1)?,
                            program: row.get(2)?,
                            section: row.get(3)?,
                            photo_url: row.get(4)?,
                            check_in_time,
                            status: row.get(6)?,
                            remarks: classify_remarks(check_in_time, late_cutoff),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// One student's attendance records, newest date first.
    pub async fn attendance_history(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceEntry>, StoreError> {
        let student_id = student_id.to_owned();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT date, check_in_time, status FROM attendance
                     WHERE student_id = ?1 ORDER BY date DESC",
                )?;
                let rows = stmt
                    .query_map([&student_id], |row| {
                        Ok(AttendanceEntry {
                            date: row.get(0)?,
                            check_in_time: row.get(1)?,
                            status: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// Roster size, distinct present, and absent = total - present.
    pub async fn dashboard_stats(&self, date: NaiveDate) -> Result<DashboardStats, StoreError> {
        let stats = self
            .conn
            .call(move |conn| {
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
                let present: i64 = conn.query_row(
                    "SELECT COUNT(DISTINCT student_id) FROM attendance
                     WHERE date = ?1 AND status = 'Present'",
                    [date],
                    |row| row.get(0),
                )?;
                Ok(DashboardStats {
                    total,
                    present,
                    absent: total - present,
                })
            })
            .await?;
        Ok(stats)
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<StudentProfile> {
    Ok(StudentProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        program: row.get(2)?,
        section: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        admission_date: row.get(6)?,
        photo_url: row.get(7)?,
    })
}
