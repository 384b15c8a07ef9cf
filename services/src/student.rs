use crate::error::AttendanceError;
use db::models::student::STUDENTS_KEY;
use db::repository::Repository;
use db::store::KeyValueStore;
use serde::Serialize;
use std::sync::Arc;

pub use db::models::student::Model as Student;

/// Attendance band shown next to a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStanding {
    Safe,
    Warning,
    Danger,
}

impl AttendanceStanding {
    pub fn classify(percent: u8) -> Self {
        match percent {
            75.. => Self::Safe,
            60..=74 => Self::Warning,
            _ => Self::Danger,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Warning => "Warning",
            Self::Danger => "Danger",
        }
    }
}

/// Rounded mean over all subjects; 0 for a student with none.
pub fn overall_attendance(student: &Student) -> u8 {
    let values = &student.attendance;
    if values.is_empty() {
        return 0;
    }
    let sum: u32 = values.values().map(|&v| u32::from(v)).sum();
    (f64::from(sum) / values.len() as f64).round() as u8
}

/// Subjects below the safe threshold.
pub fn low_attendance_subjects(student: &Student) -> Vec<(&str, u8)> {
    student
        .attendance
        .iter()
        .filter(|(_, pct)| AttendanceStanding::classify(**pct) != AttendanceStanding::Safe)
        .map(|(subject, pct)| (subject.as_str(), *pct))
        .collect()
}

#[derive(Clone)]
pub struct StudentService {
    repo: Repository<Student>,
}

impl StudentService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repo: Repository::new(store, STUDENTS_KEY),
        }
    }

    pub async fn find_by_id(&self, roll_no: &str) -> Result<Option<Student>, AttendanceError> {
        let roll_no = roll_no.trim();
        Ok(self.repo.find(|s| s.id == roll_no).await?)
    }
}
