use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ATTENDANCE_KEY: &str = "eduflow_attendance";

/// A marked attendance, keyed logically by `(session_id, roll_no)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub roll_no: String,
    pub subject: String,
    pub session_id: String,
    /// Issuance instant carried by the token, milliseconds since epoch.
    pub issued_at: i64,
    pub marked_at: DateTime<Utc>,
    /// False when the verifier had no coordinates and skipped the geofence.
    pub location_verified: bool,
}

impl Model {
    pub fn is_for(&self, session_id: &str, roll_no: &str) -> bool {
        self.session_id == session_id && self.roll_no == roll_no
    }
}
