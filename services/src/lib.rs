pub mod attendance_record;
pub mod attendance_token;
pub mod error;
pub mod student;

pub use error::AttendanceError;
