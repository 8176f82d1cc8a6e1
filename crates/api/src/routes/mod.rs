pub mod auth;
pub mod groups;
pub mod health;
pub mod reports;
pub mod sessions;
pub mod users;
