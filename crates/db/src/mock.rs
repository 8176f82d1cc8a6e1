pub mod repositories;

pub use repositories::{MockAttendanceRepo, MockGroupRepo, MockSessionRepo, MockUserRepo};
