use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

/// Width of one attendance slot in hours.
pub const SLOT_HOURS: u32 = 2;

/// Session identifier for `subject` at the current local time.
pub fn derive_session_id(subject: &str) -> String {
    derive_session_id_at(subject, &Local::now())
}

/// `SUBJECT-YYYYMMDD-slot`, where `SUBJECT` is `subject` upper-cased with all
/// whitespace removed and `slot` is `hour / 2` (0..=11). Date and hour are both
/// read in `at`'s own time zone. The date is therefore the local calendar date,
/// not the UTC one: between local midnight and UTC midnight these ids carry a
/// different date than ids built from a UTC date with a local hour.
pub fn derive_session_id_at<Tz: TimeZone>(subject: &str, at: &DateTime<Tz>) -> String {
    let compact: String = subject.chars().filter(|c| !c.is_whitespace()).collect();
    format!(
        "{}-{:04}{:02}{:02}-{}",
        compact.to_uppercase(),
        at.year(),
        at.month(),
        at.day(),
        at.hour() / SLOT_HOURS
    )
}
