use serde::{Deserialize, Serialize};

/// The six signed fields of an attendance claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedPayload {
    pub roll_no: String,
    pub subject: String,
    pub session_id: String,
    /// Milliseconds since the Unix epoch at issuance.
    pub timestamp: i64,
    pub lat: f64,
    pub lng: f64,
}

/// A signed attendance claim, as carried inside the QR code.
///
/// Field order is the wire order:
/// `{rollNo, subject, sessionId, timestamp, lat, lng, signature}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePayload {
    pub roll_no: String,
    pub subject: String,
    pub session_id: String,
    pub timestamp: i64,
    pub lat: f64,
    pub lng: f64,
    pub signature: String,
}

impl AttendancePayload {
    pub fn from_parts(unsigned: UnsignedPayload, signature: String) -> Self {
        let UnsignedPayload {
            roll_no,
            subject,
            session_id,
            timestamp,
            lat,
            lng,
        } = unsigned;
        Self {
            roll_no,
            subject,
            session_id,
            timestamp,
            lat,
            lng,
            signature,
        }
    }

    /// The fields covered by the signature, copied out.
    pub fn unsigned(&self) -> UnsignedPayload {
        UnsignedPayload {
            roll_no: self.roll_no.clone(),
            subject: self.subject.clone(),
            session_id: self.session_id.clone(),
            timestamp: self.timestamp,
            lat: self.lat,
            lng: self.lng,
        }
    }

    /// Canonical JSON text, the exact string embedded in the QR code.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Strict typed parse: missing or wrong-typed fields are rejected,
    /// unknown extra fields are ignored.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }
}
