use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/sessions/:id", get(handlers::sessions::get_session))
        .route("/api/sessions/:id/cancel", post(handlers::sessions::cancel_session))
        .route(
            "/api/sessions/:id/attendance",
            get(handlers::attendance::get_attendance).put(handlers::attendance::submit_attendance),
        )
}
