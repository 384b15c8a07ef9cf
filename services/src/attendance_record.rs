use crate::attendance_token::VerificationResult;
use crate::error::AttendanceError;
use chrono::{DateTime, Utc};
use db::models::attendance_record::ATTENDANCE_KEY;
use db::repository::Repository;
use db::store::KeyValueStore;
use std::sync::Arc;

pub use db::models::attendance_record::Model as AttendanceRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    Recorded(AttendanceRecord),
    AlreadyRecorded(AttendanceRecord),
}

/// Ledger of marked attendance, one entry per `(session_id, roll_no)`.
///
/// Lives beside the verifier, not inside it: a token can be re-verified any
/// number of times, but it is recorded once.
#[derive(Clone)]
pub struct AttendanceRecordService {
    repo: Repository<AttendanceRecord>,
}

impl AttendanceRecordService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repo: Repository::new(store, ATTENDANCE_KEY),
        }
    }

    /// Records `verdict`. `location_verified` is taken from whether the
    /// verifier evaluated the geofence.
    pub async fn mark(
        &self,
        verdict: &VerificationResult,
    ) -> Result<MarkOutcome, AttendanceError> {
        self.mark_at(verdict, Utc::now()).await
    }

    pub async fn mark_at(
        &self,
        verdict: &VerificationResult,
        now: DateTime<Utc>,
    ) -> Result<MarkOutcome, AttendanceError> {
        let claim = match (&verdict.claim, verdict.valid) {
            (Some(claim), true) => claim,
            _ => return Err(AttendanceError::NotVerified(verdict.message.clone())),
        };

        let record = AttendanceRecord {
            roll_no: claim.roll_no.clone(),
            subject: claim.subject.clone(),
            session_id: claim.session_id.clone(),
            issued_at: claim.timestamp,
            marked_at: now,
            location_verified: verdict.location_checked,
        };

        // Duplicate check and append happen in one store update.
        let outcome = self
            .repo
            .update(move |records| {
                if let Some(existing) = records
                    .iter()
                    .find(|r| r.is_for(&record.session_id, &record.roll_no))
                {
                    return MarkOutcome::AlreadyRecorded(existing.clone());
                }
                records.push(record.clone());
                MarkOutcome::Recorded(record)
            })
            .await?;

        match &outcome {
            MarkOutcome::Recorded(r) => {
                log::info!("Recorded attendance for {} in {}", r.roll_no, r.session_id)
            }
            MarkOutcome::AlreadyRecorded(r) => log::info!(
                "Attendance already recorded for {} in {}",
                r.roll_no,
                r.session_id
            ),
        }
        Ok(outcome)
    }

    pub async fn for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        Ok(self.repo.filter(|r| r.session_id == session_id).await?)
    }

    pub async fn for_student(
        &self,
        roll_no: &str,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        Ok(self.repo.filter(|r| r.roll_no == roll_no).await?)
    }
}
