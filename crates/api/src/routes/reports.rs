use axum::{Router, routing::get};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/reports/students", get(handlers::reports::student_reports))
        .route("/api/reports/groups", get(handlers::reports::group_reports))
        .route("/api/reports/dashboard", get(handlers::reports::dashboard))
}
