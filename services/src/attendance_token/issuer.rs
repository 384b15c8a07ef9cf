use super::geo::Coordinates;
use super::location::{LocationProvider, LocationSource, acquire_location};
use super::payload::{AttendancePayload, UnsignedPayload};
use super::qr::{self, QrOptions};
use super::signature;
use crate::error::AttendanceError;
use chrono::Utc;
use common::format_validation_errors;
use std::sync::Arc;
use std::time::Duration;
use util::config;
use validator::Validate;

#[derive(Debug, Validate)]
struct IssueRequest {
    #[validate(length(min = 1, message = "Roll number is required"))]
    roll_no: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    subject: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuerSettings {
    /// Classroom coordinate used when the device position is unavailable.
    pub fallback: Coordinates,
    pub location_timeout: Duration,
    pub qr: QrOptions,
}

impl IssuerSettings {
    pub fn from_config() -> Self {
        Self {
            fallback: Coordinates::new(config::classroom_lat(), config::classroom_lng()),
            location_timeout: Duration::from_millis(config::geolocation_timeout_ms()),
            qr: QrOptions::from_config(),
        }
    }
}

/// Result of one issuance: the scannable image and the payload it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// `data:image/svg+xml;base64,...`
    pub encoded_image: String,
    pub payload: AttendancePayload,
    pub location_source: LocationSource,
}

impl IssuedToken {
    /// The exact text embedded in the QR code.
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        self.payload.to_json()
    }
}

/// Signs the six fields into a payload. Pure.
pub fn assemble(
    roll_no: &str,
    subject: &str,
    session_id: &str,
    timestamp: i64,
    at: Coordinates,
) -> AttendancePayload {
    let unsigned = UnsignedPayload {
        roll_no: roll_no.to_owned(),
        subject: subject.to_owned(),
        session_id: session_id.to_owned(),
        timestamp,
        lat: at.lat,
        lng: at.lng,
    };
    let signature = signature::sign(&unsigned);
    AttendancePayload::from_parts(unsigned, signature)
}

pub struct TokenIssuer {
    location: Arc<dyn LocationProvider>,
    settings: IssuerSettings,
}

impl TokenIssuer {
    pub fn new(location: Arc<dyn LocationProvider>, settings: IssuerSettings) -> Self {
        Self { location, settings }
    }

    pub fn from_config(location: Arc<dyn LocationProvider>) -> Self {
        Self::new(location, IssuerSettings::from_config())
    }

    pub fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// Issues a token stamped with the wall clock, read after the location.
    pub async fn issue(
        &self,
        roll_no: &str,
        subject: &str,
        session_id: &str,
    ) -> Result<IssuedToken, AttendanceError> {
        self.issue_with_clock(roll_no, subject, session_id, || {
            Utc::now().timestamp_millis()
        })
        .await
    }

    /// Issues a token stamped with `now_ms`.
    pub async fn issue_at(
        &self,
        roll_no: &str,
        subject: &str,
        session_id: &str,
        now_ms: i64,
    ) -> Result<IssuedToken, AttendanceError> {
        self.issue_with_clock(roll_no, subject, session_id, || now_ms)
            .await
    }

    async fn issue_with_clock<F>(
        &self,
        roll_no: &str,
        subject: &str,
        session_id: &str,
        clock: F,
    ) -> Result<IssuedToken, AttendanceError>
    where
        F: FnOnce() -> i64,
    {
        let request = IssueRequest {
            roll_no: roll_no.trim().to_owned(),
            subject: subject.trim().to_owned(),
        };
        request
            .validate()
            .map_err(|e| AttendanceError::Validation(format_validation_errors(&e)))?;

        let (at, location_source) = acquire_location(
            self.location.as_ref(),
            self.settings.location_timeout,
            self.settings.fallback,
        )
        .await;

        let payload = assemble(
            &request.roll_no,
            &request.subject,
            session_id,
            clock(),
            at,
        );
        let encoded_image = qr::render_data_url(&payload.to_json()?, &self.settings.qr)?;

        log::info!(
            "Issued attendance token for {} in {} ({:?} location)",
            payload.roll_no,
            payload.session_id,
            location_source
        );

        Ok(IssuedToken {
            encoded_image,
            payload,
            location_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_token::location::tests::{DeniedLocation, SlowLocation};
    use crate::attendance_token::location::{FixedLocation, NoLocation};
    use serial_test::serial;
    use util::config::AppConfig;

    const CLASSROOM: Coordinates = Coordinates::new(28.6139, 77.2090);
    const NOW: i64 = 1_757_325_614_000;

    fn settings() -> IssuerSettings {
        IssuerSettings {
            fallback: CLASSROOM,
            location_timeout: Duration::from_secs(5),
            qr: QrOptions::default(),
        }
    }

    #[tokio::test]
    async fn issues_signed_payload_at_device_position() {
        let here = Coordinates::new(28.6140, 77.2091);
        let issuer = TokenIssuer::new(Arc::new(FixedLocation(here)), settings());

        let token = issuer
            .issue_at("220101", "Data Structures", "DATASTRUCTURES-20250908-5", NOW)
            .await
            .unwrap();

        assert_eq!(token.location_source, LocationSource::Device);
        assert_eq!(token.payload.lat, here.lat);
        assert_eq!(token.payload.lng, here.lng);
        assert_eq!(token.payload.timestamp, NOW);
        assert_eq!(token.payload.signature, "6E92B273");
        assert!(token.encoded_image.starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn falls_back_to_classroom_without_location() {
        let issuer = TokenIssuer::new(Arc::new(NoLocation), settings());
        let token = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();

        assert_eq!(token.location_source, LocationSource::Fallback);
        assert_eq!((token.payload.lat, token.payload.lng), (CLASSROOM.lat, CLASSROOM.lng));
    }

    #[tokio::test]
    async fn denied_permission_does_not_fail_issuance() {
        let issuer = TokenIssuer::new(Arc::new(DeniedLocation), settings());
        assert!(issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sensor_is_bounded_by_the_timeout() {
        let slow = SlowLocation {
            delay: Duration::from_secs(60),
            coords: Coordinates::new(0.0, 0.0),
        };
        let issuer = TokenIssuer::new(Arc::new(slow), settings());
        let token = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();
        assert_eq!(token.location_source, LocationSource::Fallback);
    }

    #[tokio::test]
    async fn same_instant_and_inputs_give_the_same_token() {
        let issuer = TokenIssuer::new(Arc::new(NoLocation), settings());
        let a = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();
        let b = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();
        assert_eq!(a.payload, b.payload);
        assert_eq!(a.encoded_image, b.encoded_image);
    }

    #[tokio::test]
    async fn wall_clock_issue_stamps_current_time() {
        let issuer = TokenIssuer::new(Arc::new(NoLocation), settings());
        let before = Utc::now().timestamp_millis();
        let token = issuer.issue("220101", "DS", "DS-1-0").await.unwrap();
        let after = Utc::now().timestamp_millis();
        assert!((before..=after).contains(&token.payload.timestamp));
    }

    #[tokio::test]
    async fn rejects_blank_roll_number_and_subject() {
        let issuer = TokenIssuer::new(Arc::new(NoLocation), settings());
        let err = issuer.issue_at("  ", "", "DS-1-0", NOW).await.unwrap_err();
        match err {
            AttendanceError::Validation(msg) => {
                assert!(msg.contains("Roll number is required"));
                assert!(msg.contains("Subject is required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn payload_json_is_the_canonical_text() {
        let issuer = TokenIssuer::new(Arc::new(NoLocation), settings());
        let token = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();
        let json = token.payload_json().unwrap();
        assert_eq!(AttendancePayload::parse(&json).unwrap(), token.payload);
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_not_issued() {
        let issuer = TokenIssuer::new(Arc::new(NoLocation), settings());
        let padded = issuer
            .issue_at(" 220101 ", "  DS\t", "DS-1-0", NOW)
            .await
            .unwrap();
        let clean = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();

        assert_eq!(padded.payload.roll_no, "220101");
        assert_eq!(padded.payload.subject, "DS");
        assert_eq!(padded.payload, clean.payload);
    }

    #[tokio::test]
    #[serial]
    async fn settings_follow_configuration() {
        let pretoria = Coordinates::new(-25.7545, 28.2314);
        AppConfig::set_classroom(pretoria.lat, pretoria.lng);
        AppConfig::set_geolocation_timeout_ms(1200);
        AppConfig::set_qr_width(512);

        let settings = IssuerSettings::from_config();
        let issuer = TokenIssuer::from_config(Arc::new(NoLocation));
        AppConfig::reset();

        assert_eq!(settings.fallback, pretoria);
        assert_eq!(settings.location_timeout, Duration::from_millis(1200));
        assert_eq!(settings.qr.width, 512);

        let token = issuer.issue_at("220101", "DS", "DS-1-0", NOW).await.unwrap();
        assert_eq!(token.location_source, LocationSource::Fallback);
        assert_eq!((token.payload.lat, token.payload.lng), (pretoria.lat, pretoria.lng));
    }
}
