use super::geo::{Coordinates, Geofence};
use super::payload::AttendancePayload;
use super::signature;
use chrono::{Local, TimeZone, Utc};
use serde::Serialize;
use util::config;

pub const SUCCESS_MESSAGE: &str = "✅ Attendance marked successfully!";
pub const MALFORMED_MESSAGE: &str = "❌ Invalid QR code format";

/// Why a claim was rejected. For check failures only the first failing check,
/// in declaration order after `MalformedPayload`, is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationFailure {
    MalformedPayload,
    InvalidSignature,
    Expired,
    OutsideClassroom,
}

impl VerificationFailure {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MalformedPayload => MALFORMED_MESSAGE,
            Self::InvalidSignature => "❌ Verification failed: Invalid QR",
            Self::Expired => "❌ Verification failed: QR expired",
            Self::OutsideClassroom => "❌ Verification failed: Outside classroom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    pub roll_no: String,
    pub subject: String,
    pub session_id: String,
    /// Issuance instant in local time, `%Y-%m-%d %H:%M:%S`.
    pub timestamp: String,
    pub location_valid: bool,
    pub time_valid: bool,
    pub signature_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
    /// Absent only when the input could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<VerificationDetails>,
    #[serde(skip)]
    pub failure: Option<VerificationFailure>,
    /// Whether the geofence was evaluated against a verifier position.
    #[serde(skip)]
    pub location_checked: bool,
    /// The parsed claim, untouched.
    #[serde(skip)]
    pub claim: Option<AttendancePayload>,
}

impl VerificationResult {
    fn malformed() -> Self {
        Self {
            valid: false,
            message: MALFORMED_MESSAGE.into(),
            details: None,
            failure: Some(VerificationFailure::MalformedPayload),
            location_checked: false,
            claim: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifierPolicy {
    pub classroom: Geofence,
    /// Tokens strictly younger than this are in time.
    pub validity_ms: i64,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            classroom: Geofence::new(
                Coordinates::new(config::DEFAULT_CLASSROOM_LAT, config::DEFAULT_CLASSROOM_LNG),
                config::DEFAULT_CLASSROOM_RADIUS_METERS,
            ),
            validity_ms: config::DEFAULT_TOKEN_VALIDITY_MINUTES * 60 * 1000,
        }
    }
}

impl VerifierPolicy {
    pub fn from_config() -> Self {
        Self {
            classroom: Geofence::new(
                Coordinates::new(config::classroom_lat(), config::classroom_lng()),
                config::classroom_radius_meters(),
            ),
            validity_ms: config::token_validity_minutes() * 60 * 1000,
        }
    }
}

fn format_issued_at(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Checks attendance claims. Stateless: the same claim verifies the same way
/// every time while it is in its window.
#[derive(Debug, Clone, Default)]
pub struct TokenVerifier {
    policy: VerifierPolicy,
}

impl TokenVerifier {
    pub fn new(policy: VerifierPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config() -> Self {
        Self::new(VerifierPolicy::from_config())
    }

    /// Verifies against the wall clock. The geofence is checked only when both
    /// coordinates are given; otherwise location counts as valid.
    pub fn verify(
        &self,
        raw: &str,
        current_lat: Option<f64>,
        current_lng: Option<f64>,
    ) -> VerificationResult {
        self.verify_at(
            raw,
            Coordinates::from_parts(current_lat, current_lng),
            Utc::now().timestamp_millis(),
        )
    }

    pub fn verify_at(
        &self,
        raw: &str,
        current: Option<Coordinates>,
        now_ms: i64,
    ) -> VerificationResult {
        let claim = match AttendancePayload::parse(raw) {
            Ok(claim) => claim,
            Err(err) => {
                log::warn!("Rejected attendance QR: unparseable payload ({err})");
                return VerificationResult::malformed();
            }
        };

        let signature_valid = signature::sign(&claim.unsigned()) == claim.signature;

        // A future timestamp gives a negative age, which is in time.
        let age_ms = now_ms.saturating_sub(claim.timestamp);
        let time_valid = age_ms < self.policy.validity_ms;

        let location_valid = match current {
            Some(point) => self.policy.classroom.contains(point),
            None => true,
        };

        let failure = if !signature_valid {
            Some(VerificationFailure::InvalidSignature)
        } else if !time_valid {
            Some(VerificationFailure::Expired)
        } else if !location_valid {
            Some(VerificationFailure::OutsideClassroom)
        } else {
            None
        };
        let valid = failure.is_none();
        let message = failure
            .map(|f| f.message())
            .unwrap_or(SUCCESS_MESSAGE)
            .to_owned();

        if valid {
            log::debug!(
                "Verified attendance for {} in {} (location {})",
                claim.roll_no,
                claim.session_id,
                if current.is_some() { "checked" } else { "skipped" }
            );
        } else {
            log::warn!(
                "Rejected attendance for {} in {}: {:?}",
                claim.roll_no,
                claim.session_id,
                failure
            );
        }

        VerificationResult {
            valid,
            message,
            details: Some(VerificationDetails {
                roll_no: claim.roll_no.clone(),
                subject: claim.subject.clone(),
                session_id: claim.session_id.clone(),
                timestamp: format_issued_at(claim.timestamp),
                location_valid,
                time_valid,
                signature_valid,
            }),
            failure,
            location_checked: current.is_some(),
            claim: Some(claim),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_token::issuer::assemble;
    use serde_json::json;
    use serial_test::serial;
    use util::config::AppConfig;

    const CLASSROOM: Coordinates = Coordinates::new(28.6139, 77.2090);
    const NOW: i64 = 1_757_325_614_000;
    const MINUTE: i64 = 60 * 1000;

    fn verifier() -> TokenVerifier {
        TokenVerifier::default()
    }

    fn fresh_json(timestamp: i64) -> String {
        assemble("220101", "Data Structures", "DATASTRUCTURES-20250908-5", timestamp, CLASSROOM)
            .to_json()
            .unwrap()
    }

    /// ~200 m north of the classroom.
    fn far_away() -> Coordinates {
        Coordinates::new(CLASSROOM.lat + 0.0018, CLASSROOM.lng)
    }

    fn details(result: &VerificationResult) -> &VerificationDetails {
        result.details.as_ref().expect("details present")
    }

    #[test]
    fn fresh_token_at_classroom_is_valid() {
        let result = verifier().verify_at(&fresh_json(NOW), Some(CLASSROOM), NOW);

        assert!(result.valid);
        assert_eq!(result.message, SUCCESS_MESSAGE);
        assert_eq!(result.failure, None);
        let d = details(&result);
        assert!(d.signature_valid && d.time_valid && d.location_valid);
        assert_eq!(d.roll_no, "220101");
        assert_eq!(d.session_id, "DATASTRUCTURES-20250908-5");
    }

    #[test]
    fn mutating_any_signed_field_breaks_the_signature() {
        let original: serde_json::Value = serde_json::from_str(&fresh_json(NOW)).unwrap();
        let mutations = [
            ("rollNo", json!("220102")),
            ("subject", json!("Operating Systems")),
            ("sessionId", json!("DATASTRUCTURES-20250908-6")),
            ("timestamp", json!(NOW - 1)),
        ];

        for (field, value) in mutations {
            let mut tampered = original.clone();
            tampered[field] = value;
            let result = verifier().verify_at(&tampered.to_string(), Some(CLASSROOM), NOW);

            assert!(!result.valid, "{field} mutation accepted");
            assert!(!details(&result).signature_valid, "{field} mutation kept signature");
            assert_eq!(result.message, "❌ Verification failed: Invalid QR");
        }
    }

    #[test]
    fn token_older_than_thirty_minutes_is_expired() {
        let result = verifier().verify_at(&fresh_json(NOW - 31 * MINUTE), Some(CLASSROOM), NOW);

        assert!(!result.valid);
        assert!(!details(&result).time_valid);
        assert!(details(&result).signature_valid);
        assert_eq!(result.failure, Some(VerificationFailure::Expired));
        assert_eq!(result.message, "❌ Verification failed: QR expired");
    }

    #[test]
    fn validity_window_is_exclusive() {
        let at_edge = verifier().verify_at(&fresh_json(NOW - 30 * MINUTE), None, NOW);
        assert!(!details(&at_edge).time_valid);

        let just_inside = verifier().verify_at(&fresh_json(NOW - 30 * MINUTE + 1), None, NOW);
        assert!(details(&just_inside).time_valid);
    }

    #[test]
    fn future_timestamp_is_treated_as_in_time() {
        let result = verifier().verify_at(&fresh_json(NOW + 10 * MINUTE), None, NOW);
        assert!(details(&result).time_valid);
        assert!(result.valid);
    }

    #[test]
    fn geofence_boundary() {
        let inside = verifier().verify_at(&fresh_json(NOW), Some(CLASSROOM), NOW);
        assert!(details(&inside).location_valid);

        let outside = verifier().verify_at(&fresh_json(NOW), Some(far_away()), NOW);
        assert!(!details(&outside).location_valid);
        assert!(!outside.valid);
        assert_eq!(outside.message, "❌ Verification failed: Outside classroom");
    }

    #[test]
    fn omitted_location_always_passes_the_geofence() {
        // Claimed issuance point is far away too; only the verifier's position counts.
        let json = assemble("220101", "DS", "DS-1-0", NOW, Coordinates::new(0.0, 0.0))
            .to_json()
            .unwrap();
        let result = verifier().verify(&json, None, None);
        assert!(details(&result).location_valid);
        assert!(!result.location_checked);

        let partial = verifier().verify(&json, Some(far_away().lat), None);
        assert!(details(&partial).location_valid);
        assert!(!partial.location_checked);

        let checked = verifier().verify_at(&json, Some(CLASSROOM), NOW);
        assert!(checked.location_checked);
    }

    #[test]
    fn not_json_is_malformed_without_details() {
        let result = verifier().verify("not json", None, None);
        assert!(!result.valid);
        assert!(result.details.is_none());
        assert_eq!(result.message, MALFORMED_MESSAGE);
        assert_eq!(result.failure, Some(VerificationFailure::MalformedPayload));
    }

    #[test]
    fn missing_or_mistyped_fields_are_malformed() {
        let mut value: serde_json::Value = serde_json::from_str(&fresh_json(NOW)).unwrap();
        value.as_object_mut().unwrap().remove("signature");
        assert!(verifier().verify_at(&value.to_string(), None, NOW).details.is_none());

        let mut value: serde_json::Value = serde_json::from_str(&fresh_json(NOW)).unwrap();
        value["lat"] = json!("north");
        assert!(verifier().verify_at(&value.to_string(), None, NOW).details.is_none());
    }

    #[test]
    fn failure_message_follows_precedence() {
        // Bad signature, expired and out of range at once: signature wins.
        let mut value: serde_json::Value =
            serde_json::from_str(&fresh_json(NOW - 60 * MINUTE)).unwrap();
        value["signature"] = json!("BAD");
        let result = verifier().verify_at(&value.to_string(), Some(far_away()), NOW);
        let d = details(&result);
        assert!(!d.signature_valid && !d.time_valid && !d.location_valid);
        assert_eq!(result.failure, Some(VerificationFailure::InvalidSignature));

        // Expired and out of range: expiry wins.
        let result = verifier().verify_at(&fresh_json(NOW - 60 * MINUTE), Some(far_away()), NOW);
        assert_eq!(result.failure, Some(VerificationFailure::Expired));
    }

    #[test]
    fn re_verification_is_idempotent() {
        let json = fresh_json(NOW);
        let first = verifier().verify_at(&json, Some(CLASSROOM), NOW);
        let second = verifier().verify_at(&json, Some(CLASSROOM), NOW + MINUTE);
        assert!(first.valid && second.valid);
        assert_eq!(first.details, second.details);
    }

    #[test]
    fn serialized_result_omits_details_only_when_malformed() {
        let bad = serde_json::to_value(verifier().verify("{", None, None)).unwrap();
        assert_eq!(bad, json!({"valid": false, "message": MALFORMED_MESSAGE}));

        let ok = serde_json::to_value(verifier().verify_at(&fresh_json(NOW), None, NOW)).unwrap();
        assert_eq!(ok["details"]["rollNo"], "220101");
        assert_eq!(ok["details"]["signatureValid"], true);
        assert!(ok.get("failure").is_none());
    }

    #[test]
    fn custom_policy_radius_and_window() {
        let policy = VerifierPolicy {
            classroom: Geofence::new(CLASSROOM, 500.0),
            validity_ms: 5 * MINUTE,
        };
        let verifier = TokenVerifier::new(policy);

        let near = verifier.verify_at(&fresh_json(NOW), Some(far_away()), NOW);
        assert!(details(&near).location_valid);

        let stale = verifier.verify_at(&fresh_json(NOW - 6 * MINUTE), None, NOW);
        assert!(!details(&stale).time_valid);
    }

    #[test]
    #[serial]
    fn policy_follows_configured_classroom_and_window() {
        let pretoria = Coordinates::new(-25.7545, 28.2314);
        AppConfig::set_classroom(pretoria.lat, pretoria.lng);
        AppConfig::set_classroom_radius_meters(250.0);
        AppConfig::set_token_validity_minutes(10);

        let policy = VerifierPolicy::from_config();
        let verifier = TokenVerifier::from_config();
        AppConfig::reset();

        assert_eq!(policy.classroom, Geofence::new(pretoria, 250.0));
        assert_eq!(policy.validity_ms, 10 * MINUTE);

        let on_site = verifier.verify_at(&fresh_json(NOW - 9 * MINUTE), Some(pretoria), NOW);
        assert!(on_site.valid, "{}", on_site.message);

        let stale = verifier.verify_at(&fresh_json(NOW - 11 * MINUTE), Some(pretoria), NOW);
        assert_eq!(stale.failure, Some(VerificationFailure::Expired));

        let in_delhi = verifier.verify_at(&fresh_json(NOW), Some(CLASSROOM), NOW);
        assert_eq!(in_delhi.failure, Some(VerificationFailure::OutsideClassroom));
    }
}
