//! Attendance gate — at-most-one Present record per student per day.
//!
//! Per (student, date) the state machine is Unmarked -> Marked, one way.
//! Commit is a single atomic conditional insert, so two racing commits
//! for the same student on the same day produce exactly one record.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::store::{Store, StoreError};

/// Default late cutoff: check-ins strictly after 10:00:00 are Late.
pub fn default_late_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).expect("valid constant time")
}

/// Punctuality classification, derived at read time from the persisted
/// check-in time. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Remark {
    #[serde(rename = "On Time")]
    OnTime,
    Late,
}

/// Classify a check-in against the cutoff. Strictly after the cutoff is
/// Late; the cutoff itself is On Time.
pub fn classify_remarks(check_in: NaiveTime, cutoff: NaiveTime) -> Remark {
    if check_in > cutoff {
        Remark::Late
    } else {
        Remark::OnTime
    }
}

/// Idempotent check/commit over the persisted attendance table.
#[derive(Clone)]
pub struct AttendanceGate {
    store: Store,
}

impl AttendanceGate {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Whether a Marked record exists. Pure read, no side effects.
    pub async fn check(&self, identity: &str, date: NaiveDate) -> Result<bool, StoreError> {
        self.store.attendance_exists(identity, date).await
    }

    /// Transition Unmarked -> Marked. Returns true iff this call created
    /// the record; a lost race returns false without modifying anything.
    pub async fn commit(
        &self,
        identity: &str,
        date: NaiveDate,
        check_in_time: NaiveTime,
    ) -> Result<bool, StoreError> {
        let created = self.store.insert_attendance(identity, date, check_in_time).await?;
        if created {
            tracing::info!(identity, %date, %check_in_time, "attendance marked");
        } else {
            tracing::debug!(identity, %date, "attendance already marked");
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewStudent;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_remarks_before_cutoff_on_time() {
        assert_eq!(classify_remarks(hms(9, 59, 59), default_late_cutoff()), Remark::OnTime);
    }

    #[test]
    fn test_remarks_at_cutoff_on_time() {
        assert_eq!(classify_remarks(hms(10, 0, 0), default_late_cutoff()), Remark::OnTime);
    }

    #[test]
    fn test_remarks_after_cutoff_late() {
        assert_eq!(classify_remarks(hms(10, 0, 1), default_late_cutoff()), Remark::Late);
    }

    async fn gate_with_student(id: &str) -> AttendanceGate {
        let store = Store::open_in_memory().await.unwrap();
        store
            .add_student(NewStudent {
                id: id.to_owned(),
                name: "Test Student".to_owned(),
                program: "BSIT".to_owned(),
                section: "B".to_owned(),
                email: "t@example.edu".to_owned(),
                phone: "000".to_owned(),
                admission_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                photo_url: None,
            })
            .await
            .unwrap();
        AttendanceGate::new(store)
    }

    #[tokio::test]
    async fn test_check_then_commit_then_check() {
        let gate = gate_with_student("1001").await;
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();

        assert!(!gate.check("1001", date).await.unwrap());
        assert!(gate.commit("1001", date, hms(8, 0, 0)).await.unwrap());
        assert!(gate.check("1001", date).await.unwrap());
        assert!(!gate.commit("1001", date, hms(8, 5, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_commits_exactly_one_succeeds() {
        let gate = gate_with_student("1001").await;
        let date = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();

        let mut handles = Vec::new();
        for i in 0..16u32 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.commit("1001", date, hms(8, 0, i)).await.unwrap()
            }));
        }

        let mut successes = 0;
        for h in handles {
            if h.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert!(gate.check("1001", date).await.unwrap());
    }
}
