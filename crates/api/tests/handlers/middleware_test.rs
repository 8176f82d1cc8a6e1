use argon2::PasswordVerifier;
use axum::{
    body::to_bytes,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION},
};
use axum_test::TestServer;
use halaqa_api::{
    build_router,
    middleware::{auth, error_handling::map_error},
};
use halaqa_core::{
    errors::HalaqaError,
    models::user::{Role, User},
    validation::ValidationErrors,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::test_utils::{TestContext, token_for, user};

/// A router where every token resolves to `admin`.
fn admin_server(admin: &User, ctx: impl FnOnce(&mut TestContext)) -> TestServer {
    let known = admin.clone();
    let mut context = TestContext::new();
    context
        .users
        .expect_get_user()
        .returning(move |_| Ok(Some(known.clone())));
    ctx(&mut context);
    TestServer::new(build_router(context.into_state())).unwrap()
}

fn bearer(user: &User) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token_for(user))).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[rstest]
#[case(HalaqaError::NotFound("Group not found".to_string()), StatusCode::NOT_FOUND)]
#[case(HalaqaError::invalid_field("name", "is required"), StatusCode::BAD_REQUEST)]
#[case(HalaqaError::Authentication("Invalid password".to_string()), StatusCode::UNAUTHORIZED)]
#[case(HalaqaError::forbidden(), StatusCode::FORBIDDEN)]
#[case(HalaqaError::Conflict("Session already exists".to_string()), StatusCode::CONFLICT)]
#[case(HalaqaError::Database(eyre::eyre!("connection reset")), StatusCode::INTERNAL_SERVER_ERROR)]
#[tokio::test]
async fn errors_map_to_status_codes(#[case] error: HalaqaError, #[case] expected: StatusCode) {
    let response = map_error(error);

    assert_eq!(response.status(), expected);
}

#[tokio::test]
async fn internal_errors_hide_their_cause() {
    let error = HalaqaError::Internal(Box::new(std::io::Error::other("disk on fire")));

    let response = map_error(error);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn validation_body_lists_every_field() {
    let mut errors = ValidationErrors::new();
    errors.push("username", "must be at least 3 characters");
    errors.push("password", "must be at least 8 characters");

    let body = body_json(map_error(HalaqaError::Validation(errors))).await;

    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["username", "password"]);
    assert_eq!(body["fields"][1]["message"], "must be at least 8 characters");
}

#[tokio::test]
async fn conflict_body_carries_the_message() {
    let body = body_json(map_error(HalaqaError::Conflict(
        "Session already exists".to_string(),
    )))
    .await;

    assert_eq!(body["error"], "Conflict: Session already exists");
    assert!(body.get("fields").is_none());
}

#[test]
fn hashed_passwords_verify_with_argon2() {
    let password = "correct horse";
    let hashed = auth::hash_password(password).unwrap();

    assert_ne!(hashed, password);
    assert!(hashed.starts_with("$argon2"));

    let parsed_hash = argon2::PasswordHash::new(&hashed).unwrap();
    let argon2 = argon2::Argon2::default();
    assert!(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok());
    assert!(argon2.verify_password(b"wrong horse", &parsed_hash).is_err());

    assert!(auth::verify_password(password, &hashed).unwrap());
    assert!(!auth::verify_password("wrong horse", &hashed).unwrap());
}

#[tokio::test]
async fn lowercase_enum_in_body_is_a_field_error() {
    let admin = user(Role::Admin);
    let server = admin_server(&admin, |ctx| {
        ctx.groups.expect_get_group().never();
        ctx.groups.expect_set_group_status().never();
    });

    let response = server
        .put(&format!("/api/groups/{}/status", Uuid::new_v4()))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "status": "active" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["fields"][0]["field"], "status");
    assert!(
        body["fields"][0]["message"]
            .as_str()
            .is_some_and(|m| m.contains("unknown variant `active`"))
    );
}

#[tokio::test]
async fn body_without_json_content_type_is_a_field_error() {
    let admin = user(Role::Admin);
    let server = admin_server(&admin, |ctx| {
        ctx.users.expect_create_user().never();
    });

    let response = server
        .post("/api/users")
        .add_header(AUTHORIZATION, bearer(&admin))
        .text("username=yusuf")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["fields"][0]["field"], "body");
}

#[tokio::test]
async fn lowercase_enum_in_query_is_a_field_error() {
    let admin = user(Role::Admin);
    let server = admin_server(&admin, |ctx| {
        ctx.users.expect_list_users().never();
    });

    let response = server
        .get("/api/users")
        .add_query_param("role", "admin")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert!(matches!(body["fields"][0]["field"].as_str(), Some("role" | "query")));
    assert!(body["error"].as_str().is_some_and(|e| e.starts_with("Validation error")));
}
