//! # Halaqa Core
//!
//! Domain types and business rules for managing study groups: who may do
//! what ([`authz`]), how group and session statuses move
//! ([`models::group`], [`models::session`]), how a weekly schedule turns
//! into sessions ([`schedule`]), and how attendance rolls up into reports
//! ([`reports`]). Nothing in this crate performs I/O.

pub mod authz;
pub mod errors;
pub mod models;
pub mod reports;
pub mod schedule;
pub mod validation;
