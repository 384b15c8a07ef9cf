use anyhow::{Context, Result, bail};
use db::store::KeyValueStore;
use services::attendance_record::{AttendanceRecordService, MarkOutcome};
use services::attendance_token::qr;
use services::attendance_token::{
    Coordinates, FixedLocation, LocationProvider, NoLocation, TokenIssuer, TokenVerifier,
    derive_session_id,
};
use services::student::{
    AttendanceStanding, StudentService, low_attendance_subjects, overall_attendance,
};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

pub struct IssueArgs {
    pub roll_no: String,
    pub subject: String,
    pub session_id: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub svg_out: Option<PathBuf>,
    pub terminal: bool,
}

async fn open_store() -> Result<Arc<dyn KeyValueStore>> {
    let store = db::connect().await.context("Failed to open the attendance store")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    db::seeders::seed(store.clone())
        .await
        .context("Failed to seed sample data")?;
    Ok(store)
}

pub fn session_id(subject: &str) -> Result<ExitCode> {
    println!("{}", derive_session_id(subject));
    Ok(ExitCode::SUCCESS)
}

pub async fn issue(args: IssueArgs) -> Result<ExitCode> {
    let location: Arc<dyn LocationProvider> = match Coordinates::from_parts(args.lat, args.lng) {
        Some(here) => Arc::new(FixedLocation(here)),
        None => Arc::new(NoLocation),
    };
    let issuer = TokenIssuer::from_config(location);

    let session_id = args
        .session_id
        .unwrap_or_else(|| derive_session_id(&args.subject));
    let token = issuer
        .issue(&args.roll_no, &args.subject, &session_id)
        .await?;
    let json = token.payload_json()?;

    if let Some(path) = &args.svg_out {
        let svg = qr::render_svg(&json, &issuer.settings().qr)?;
        std::fs::write(path, svg)
            .with_context(|| format!("Failed to write QR code to {}", path.display()))?;
        println!("QR code written to {}", path.display());
    }
    if args.terminal {
        println!("{}", qr::render_terminal(&json)?);
    }

    println!("Session: {}", token.payload.session_id);
    println!("Valid for {} minutes", util::config::token_validity_minutes());
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

fn read_payload(payload: Option<String>) -> Result<String> {
    match payload.as_deref() {
        Some(text) if text != "-" => Ok(text.to_owned()),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read payload from stdin")?;
            Ok(buf)
        }
    }
}

pub async fn verify(
    payload: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    mark: bool,
) -> Result<ExitCode> {
    let raw = read_payload(payload)?;
    if raw.trim().is_empty() {
        bail!("No payload given; paste the QR code data");
    }

    let verifier = TokenVerifier::from_config();
    let result = verifier.verify(&raw, lat, lng);
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.valid {
        return Ok(ExitCode::FAILURE);
    }

    if !result.location_checked {
        println!("Location not verified");
    }

    if mark {
        let ledger = AttendanceRecordService::new(open_store().await?);
        match ledger.mark(&result).await? {
            MarkOutcome::Recorded(r) => {
                println!("Recorded attendance for {} in {}", r.roll_no, r.session_id)
            }
            MarkOutcome::AlreadyRecorded(r) => println!(
                "Attendance already recorded for {} in {}",
                r.roll_no, r.session_id
            ),
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn student(roll_no: &str) -> Result<ExitCode> {
    let service = StudentService::new(open_store().await?);
    let Some(student) = service.find_by_id(roll_no).await? else {
        eprintln!("No student found with Roll No {roll_no}");
        return Ok(ExitCode::FAILURE);
    };

    let overall = overall_attendance(&student);
    println!(
        "{} • {} • {} • Year {}",
        student.name, student.id, student.branch, student.year
    );
    println!(
        "Overall attendance: {}% ({})",
        overall,
        AttendanceStanding::classify(overall).label()
    );
    for (subject, pct) in &student.attendance {
        println!(
            "  {subject}: {pct}% ({})",
            AttendanceStanding::classify(*pct).label()
        );
    }

    let low = low_attendance_subjects(&student);
    if !low.is_empty() {
        println!("{} subject(s) below 75%", low.len());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use services::attendance_record::AttendanceRecord;
    use util::config::AppConfig;
    use util::test_helpers::setup_test_database_path;

    #[test]
    fn inline_payload_is_used_as_is() {
        assert_eq!(read_payload(Some("{}".into())).unwrap(), "{}");
    }

    #[tokio::test]
    #[serial]
    async fn issue_writes_svg_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("qr.svg");

        let code = issue(IssueArgs {
            roll_no: "220101".into(),
            subject: "Data Structures".into(),
            session_id: None,
            lat: None,
            lng: None,
            svg_out: Some(path.clone()),
            terminal: false,
        })
        .await
        .unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert!(std::fs::read_to_string(path).unwrap().contains("<svg"));
    }

    #[tokio::test]
    #[serial]
    async fn verify_and_mark_records_into_the_configured_store() {
        let _tmp = setup_test_database_path();

        let issuer = TokenIssuer::from_config(Arc::new(NoLocation));
        let token = issuer.issue("220101", "DS", "DS-20250908-5").await.unwrap();
        let json = token.payload_json().unwrap();

        let code = verify(Some(json.clone()), None, None, true).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let store = open_store().await.unwrap();
        let records: Vec<AttendanceRecord> = AttendanceRecordService::new(store)
            .for_session("DS-20250908-5")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].location_verified);

        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn marking_with_a_position_records_location_as_verified() {
        let _tmp = setup_test_database_path();

        let issuer = TokenIssuer::from_config(Arc::new(NoLocation));
        let token = issuer.issue("220102", "DS", "DS-20250908-5").await.unwrap();
        let json = token.payload_json().unwrap();
        let (lat, lng) = (util::config::classroom_lat(), util::config::classroom_lng());

        let code = verify(Some(json), Some(lat), Some(lng), true).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let store = open_store().await.unwrap();
        let records = AttendanceRecordService::new(store)
            .for_student("220102")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].location_verified);

        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn invalid_payload_exits_with_failure() {
        let code = verify(Some("not json".into()), None, None, false).await.unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[tokio::test]
    #[serial]
    async fn student_lookup_reports_missing_roll_number() {
        let _tmp = setup_test_database_path();
        assert_eq!(student("220101").await.unwrap(), ExitCode::SUCCESS);
        assert_eq!(student("000000").await.unwrap(), ExitCode::FAILURE);
        AppConfig::reset();
    }
}
