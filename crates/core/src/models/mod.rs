pub mod attendance;
pub mod common;
pub mod group;
pub mod report;
pub mod session;
pub mod user;
