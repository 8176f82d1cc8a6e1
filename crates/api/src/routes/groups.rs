use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/groups",
            get(handlers::groups::list_groups).post(handlers::groups::create_group),
        )
        .route(
            "/api/groups/:id",
            get(handlers::groups::get_group)
                .put(handlers::groups::update_group)
                .delete(handlers::groups::delete_group),
        )
        .route("/api/groups/:id/status", put(handlers::groups::update_group_status))
        .route("/api/groups/:id/students", post(handlers::groups::add_student))
        .route(
            "/api/groups/:id/students/:student_id",
            delete(handlers::groups::remove_student),
        )
        .route(
            "/api/groups/:id/sessions",
            get(handlers::sessions::list_group_sessions).post(handlers::sessions::create_session),
        )
        .route(
            "/api/groups/:id/sessions/generate",
            post(handlers::sessions::generate_sessions),
        )
}
