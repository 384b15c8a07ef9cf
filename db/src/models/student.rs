use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STUDENTS_KEY: &str = "eduflow_students";

/// A student as held by the portal's data layer. `id` is the roll number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub branch: String,
    pub year: u8,
    /// Subject name -> attendance percentage (0..=100).
    #[serde(default)]
    pub attendance: BTreeMap<String, u8>,
    #[serde(default)]
    pub xp: u32,
}

impl Model {
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.attendance.keys().map(String::as_str)
    }
}
