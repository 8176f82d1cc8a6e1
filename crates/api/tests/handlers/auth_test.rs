use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use halaqa_api::{build_router, middleware::auth::hash_password};
use halaqa_core::models::user::{LoginResponse, Role, User};
use halaqa_db::models::UserCredentials;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::test_utils::{TestContext, group, token_for, user};

fn bearer(user: &User) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token_for(user))).unwrap()
}

fn server(ctx: TestContext) -> TestServer {
    TestServer::new(build_router(ctx.into_state())).unwrap()
}

#[test_log::test(tokio::test)]
async fn login_returns_a_working_token() {
    let tutor = user(Role::Tutor);
    let credentials = UserCredentials {
        user: tutor.clone(),
        password_hash: hash_password("jazakallah").unwrap(),
    };
    let username = tutor.username.clone();

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_credentials()
        .withf(move |login| login == username)
        .returning(move |_| Ok(Some(credentials.clone())));
    let known = tutor.clone();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(known.clone())));
    let server = server(ctx);

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": format!(" {} ", tutor.username), "password": "jazakallah" }))
        .await;
    response.assert_status_ok();
    let login: LoginResponse = response.json();
    assert_eq!(login.user.id, tutor.id);

    let me = server
        .get("/api/auth/me")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", login.access_token)).unwrap(),
        )
        .await;
    me.assert_status_ok();
    assert_eq!(me.json::<User>().username, tutor.username);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let student = user(Role::Student);
    let credentials = UserCredentials {
        user: student.clone(),
        password_hash: hash_password("right-password").unwrap(),
    };
    let username = student.username.clone();

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_credentials()
        .returning(move |login| {
            Ok((login == username).then(|| credentials.clone()))
        });
    let server = server(ctx);

    let wrong = server
        .post("/api/auth/login")
        .json(&json!({ "username": student.username, "password": "wrong-password" }))
        .await;
    let unknown = server
        .post("/api/auth/login")
        .json(&json!({ "username": "nobody", "password": "wrong-password" }))
        .await;

    wrong.assert_status(StatusCode::UNAUTHORIZED);
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>(), unknown.json::<Value>());
}

#[tokio::test]
async fn missing_or_foreign_tokens_are_rejected() {
    let ctx = TestContext::new();
    let server = server(ctx);

    server
        .get("/api/auth/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not.a.token"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_users_lose_access_immediately() {
    let tutor = user(Role::Tutor);

    let mut ctx = TestContext::new();
    ctx.users.expect_get_user().returning(|_| Ok(None));
    let server = server(ctx);

    server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&tutor))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tutor_token_cannot_change_group_status() {
    let tutor = user(Role::Tutor);
    let own = group(tutor.id, vec![]);
    let path = format!("/api/groups/{}/status", own.id);

    let mut ctx = TestContext::new();
    let known = tutor.clone();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(known.clone())));
    ctx.groups
        .expect_get_group()
        .returning(move |_| Ok(Some(own.clone())));
    ctx.groups.expect_set_group_status().never();
    let server = server(ctx);

    let response = server
        .put(&path)
        .add_header(AUTHORIZATION, bearer(&tutor))
        .json(&json!({ "status": "COMPLETED" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let server = server(TestContext::new());

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>(), json!({ "status": "ok" }));

    let version = server.get("/version").await;
    assert_eq!(version.json::<Value>()["name"], "halaqa-api");

    server
        .get("/api/nowhere")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
