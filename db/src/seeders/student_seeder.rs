use crate::models::student::{Model as Student, STUDENTS_KEY};
use crate::repository::Repository;
use crate::store::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;

fn student(
    id: &str,
    name: &str,
    branch: &str,
    year: u8,
    attendance: &[(&str, u8)],
    xp: u32,
) -> Student {
    Student {
        id: id.into(),
        name: name.into(),
        branch: branch.into(),
        year,
        attendance: attendance
            .iter()
            .map(|(subject, pct)| (subject.to_string(), *pct))
            .collect::<BTreeMap<_, _>>(),
        xp,
    }
}

pub fn sample_students() -> Vec<Student> {
    vec![
        student(
            "220101",
            "Aarav Sharma",
            "CSE",
            3,
            &[
                ("Data Structures", 82),
                ("Operating Systems", 71),
                ("Computer Networks", 58),
            ],
            1250,
        ),
        student(
            "220102",
            "Diya Patel",
            "CSE",
            3,
            &[
                ("Data Structures", 91),
                ("Operating Systems", 88),
                ("Computer Networks", 79),
            ],
            1840,
        ),
        student(
            "220215",
            "Kabir Singh",
            "ECE",
            2,
            &[("Signals and Systems", 64), ("Digital Electronics", 55)],
            620,
        ),
    ]
}

/// Writes the sample roster unless the students key already exists.
/// Returns whether anything was written.
pub async fn seed_if_empty(store: Arc<dyn KeyValueStore>) -> Result<bool, StoreError> {
    let repo: Repository<Student> = Repository::new(store, STUDENTS_KEY);
    if repo.is_initialized().await? {
        return Ok(false);
    }

    log::info!("Seeding students...");
    repo.replace_all(&sample_students()).await?;
    Ok(true)
}
