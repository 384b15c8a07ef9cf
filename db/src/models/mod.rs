pub mod attendance_record;
pub mod kv_record;
pub mod student;

pub use attendance_record::Model as AttendanceRecord;
pub use kv_record::Entity as KvRecord;
pub use student::Model as Student;
