use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use halaqa_api::{
    handlers::{
        profile::{change_password, update_profile},
        users::{ListUsersQuery, create_user, delete_user, get_user, list_users, update_user},
    },
    middleware::{
        auth::{hash_password, verify_password},
        extract::{AppJson, AppQuery},
    },
};
use halaqa_core::{
    errors::HalaqaError,
    models::{
        attendance::{AttendanceHistoryItem, AttendanceStatus},
        common::PageRequest,
        user::{
            ChangePasswordRequest, CreateUserRequest, Role, UpdateProfileRequest,
            UpdateUserRequest, User, UserProfile,
        },
    },
};
use halaqa_db::repositories::NewUser;
use mockall::predicate::{always, eq};
use pretty_assertions::assert_eq;
use rstest::rstest;
use uuid::Uuid;

use crate::test_utils::{TestContext, auth_user, days_from_today, group, user};

fn new_student_request() -> CreateUserRequest {
    CreateUserRequest {
        username: "  yusuf_01 ".to_string(),
        name: "Yusuf Ahmed".to_string(),
        email: Some("   ".to_string()),
        role: Role::Student,
        password: "bismillah123".to_string(),
        profile: UserProfile::default(),
    }
}

fn created_from(new: &NewUser) -> User {
    let mut created = user(new.role);
    created.username = new.username.clone();
    created.name = new.name.clone();
    created.email = new.email.clone();
    created
}

#[test_log::test(tokio::test)]
async fn admin_creates_users_with_hashed_password() {
    let admin = user(Role::Admin);

    let mut ctx = TestContext::new();
    ctx.users
        .expect_username_taken()
        .with(eq("yusuf_01"), eq(None))
        .returning(|_, _| Ok(false));
    ctx.users
        .expect_create_user()
        .withf(|new| {
            new.username == "yusuf_01"
                && new.email.is_none()
                && verify_password("bismillah123", &new.password_hash).unwrap_or(false)
        })
        .times(1)
        .returning(|new| Ok(created_from(&new)));

    let (status, Json(created)) =
        create_user(State(ctx.into_state()), auth_user(&admin), AppJson(new_student_request()))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.username, "yusuf_01");
    assert_eq!(created.role, Role::Student);
}

#[rstest]
#[case(Role::Moderator)]
#[case(Role::Tutor)]
#[case(Role::Student)]
#[tokio::test]
async fn only_admins_create_users(#[case] role: Role) {
    let caller = user(role);
    let mut ctx = TestContext::new();
    ctx.users.expect_create_user().never();

    let err = create_user(State(ctx.into_state()), auth_user(&caller), AppJson(new_student_request()))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let admin = user(Role::Admin);
    let mut ctx = TestContext::new();
    ctx.users
        .expect_username_taken()
        .returning(|_, _| Ok(true));
    ctx.users.expect_create_user().never();

    let err = create_user(State(ctx.into_state()), auth_user(&admin), AppJson(new_student_request()))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_fields_are_all_reported() {
    let admin = user(Role::Admin);
    let ctx = TestContext::new();

    let request = CreateUserRequest {
        username: "x!".to_string(),
        password: "short".to_string(),
        email: Some("not-an-email".to_string()),
        ..new_student_request()
    };

    let err = create_user(State(ctx.into_state()), auth_user(&admin), AppJson(request))
        .await
        .unwrap_err();

    let HalaqaError::Validation(errors) = err.0 else {
        panic!("expected a validation error");
    };
    let fields: Vec<&str> = errors.fields().iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"email"));
}

#[tokio::test]
async fn moderators_list_users_by_role() {
    let moderator = user(Role::Moderator);
    let tutors = vec![user(Role::Tutor), user(Role::Tutor)];

    let mut ctx = TestContext::new();
    let listed = tutors.clone();
    ctx.users
        .expect_list_users()
        .withf(|filter, page| {
            filter.role == Some(Role::Tutor) && *page == PageRequest::new(Some(2), Some(20))
        })
        .returning(move |_, _| Ok((listed.clone(), 2)));

    let Json(page) = list_users(
        State(ctx.into_state()),
        auth_user(&moderator),
        AppQuery(ListUsersQuery {
            role: Some(Role::Tutor),
            page: Some(2),
            limit: Some(20),
            ..ListUsersQuery::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(page.meta.total, 2);
    assert_eq!(page.meta.page, 2);
    assert_eq!(page.data, tutors);
}

#[tokio::test]
async fn students_see_only_themselves() {
    let student = user(Role::Student);
    let other = user(Role::Student);
    let own = student.clone();

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .with(eq(student.id))
        .returning(move |_| Ok(Some(own.clone())));

    let state = ctx.into_state();

    let Json(me) = get_user(State(state.clone()), auth_user(&student), Path(student.id))
        .await
        .unwrap();
    assert_eq!(me.id, student.id);

    let err = get_user(State(state), auth_user(&student), Path(other.id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn moderators_cannot_change_roles() {
    let moderator = user(Role::Moderator);
    let tutor = user(Role::Tutor);
    let tutor_id = tutor.id;

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(tutor.clone())));
    ctx.users.expect_update_user().never();

    let err = update_user(
        State(ctx.into_state()),
        auth_user(&moderator),
        Path(tutor_id),
        AppJson(UpdateUserRequest {
            role: Some(Role::Admin),
            ..UpdateUserRequest::default()
        }),
    )
    .await
    .unwrap_err();

    // moderators cannot manage users at all
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

fn role_change(role: Role) -> AppJson<UpdateUserRequest> {
    AppJson(UpdateUserRequest {
        role: Some(role),
        ..UpdateUserRequest::default()
    })
}

#[tokio::test]
async fn admins_cannot_change_their_own_role() {
    let admin = user(Role::Admin);
    let admin_id = admin.id;
    let stored = admin.clone();

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(stored.clone())));
    ctx.users.expect_update_user().never();

    let err = update_user(
        State(ctx.into_state()),
        auth_user(&admin),
        Path(admin_id),
        role_change(Role::Student),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn tutors_of_record_keep_a_leading_role() {
    let admin = user(Role::Admin);
    let tutor = user(Role::Tutor);
    let tutor_id = tutor.id;

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(tutor.clone())));
    ctx.groups
        .expect_all_groups()
        .withf(move |filter| filter.tutor_id == Some(tutor_id))
        .returning(move |_| Ok(vec![group(tutor_id, vec![])]));
    ctx.users.expect_update_user().never();

    let err = update_user(
        State(ctx.into_state()),
        auth_user(&admin),
        Path(tutor_id),
        role_change(Role::Student),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn enrolled_students_cannot_be_promoted() {
    let admin = user(Role::Admin);
    let student = user(Role::Student);
    let student_id = student.id;

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(student.clone())));
    ctx.groups
        .expect_all_groups()
        .withf(move |filter| filter.student_id == Some(student_id))
        .returning(move |_| Ok(vec![group(Uuid::new_v4(), vec![student_id])]));
    ctx.users.expect_update_user().never();

    let err = update_user(
        State(ctx.into_state()),
        auth_user(&admin),
        Path(student_id),
        role_change(Role::Tutor),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unassigned_tutor_can_become_a_moderator() {
    let admin = user(Role::Admin);
    let tutor = user(Role::Tutor);
    let tutor_id = tutor.id;
    let promoted = User {
        role: Role::Moderator,
        ..tutor.clone()
    };

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(tutor.clone())));
    ctx.groups.expect_all_groups().never();
    ctx.users
        .expect_update_user()
        .withf(move |id, changes| *id == tutor_id && changes.role == Some(Role::Moderator))
        .times(1)
        .returning(move |_, _| Ok(Some(promoted.clone())));

    let Json(updated) = update_user(
        State(ctx.into_state()),
        auth_user(&admin),
        Path(tutor_id),
        role_change(Role::Moderator),
    )
    .await
    .unwrap();

    assert_eq!(updated.role, Role::Moderator);
}

#[tokio::test]
async fn empty_password_on_edit_keeps_the_old_one() {
    let admin = user(Role::Admin);
    let student = user(Role::Student);
    let student_id = student.id;
    let renamed = User {
        name: "Maryam Saleh".to_string(),
        ..student.clone()
    };

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_user()
        .returning(move |_| Ok(Some(student.clone())));
    ctx.users
        .expect_update_user()
        .withf(move |id, changes| *id == student_id && changes.password_hash.is_none())
        .returning(move |_, _| Ok(Some(renamed.clone())));

    let Json(updated) = update_user(
        State(ctx.into_state()),
        auth_user(&admin),
        Path(student_id),
        AppJson(UpdateUserRequest {
            name: Some("Maryam Saleh".to_string()),
            password: Some(String::new()),
            ..UpdateUserRequest::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.name, "Maryam Saleh");
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let admin = user(Role::Admin);
    let mut ctx = TestContext::new();
    ctx.users.expect_delete_user().never();

    let err = delete_user(State(ctx.into_state()), auth_user(&admin), Path(admin.id))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn tutors_of_record_cannot_be_deleted() {
    let admin = user(Role::Admin);
    let tutor_id = Uuid::new_v4();

    let mut ctx = TestContext::new();
    ctx.groups
        .expect_all_groups()
        .withf(move |filter| filter.tutor_id == Some(tutor_id))
        .returning(move |_| Ok(vec![group(tutor_id, vec![])]));
    ctx.users.expect_delete_user().never();

    let err = delete_user(State(ctx.into_state()), auth_user(&admin), Path(tutor_id))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn students_with_finalized_attendance_are_kept() {
    let admin = user(Role::Admin);
    let student_id = Uuid::new_v4();

    let mut ctx = TestContext::new();
    ctx.groups.expect_all_groups().returning(|_| Ok(vec![]));
    ctx.attendance
        .expect_history_for_students()
        .withf(move |ids| ids.to_vec() == vec![student_id])
        .returning(move |_| {
            Ok(vec![AttendanceHistoryItem {
                session_id: Uuid::new_v4(),
                group_id: Uuid::new_v4(),
                student_id,
                session_date: days_from_today(-7),
                status: AttendanceStatus::Attended,
            }])
        });
    ctx.users.expect_delete_user().never();

    let err = delete_user(State(ctx.into_state()), auth_user(&admin), Path(student_id))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn deleting_a_missing_user_is_not_found() {
    let admin = user(Role::Admin);

    let mut ctx = TestContext::new();
    ctx.groups.expect_all_groups().returning(|_| Ok(vec![]));
    ctx.attendance
        .expect_history_for_students()
        .returning(|_| Ok(vec![]));
    ctx.users.expect_delete_user().returning(|_| Ok(false));

    let err = delete_user(State(ctx.into_state()), auth_user(&admin), Path(Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_update_cannot_steal_an_email() {
    let tutor = user(Role::Tutor);

    let mut ctx = TestContext::new();
    ctx.users
        .expect_email_taken()
        .with(eq("taken@example.com"), always())
        .returning(|_, _| Ok(true));
    ctx.users.expect_update_user().never();

    let err = update_profile(
        State(ctx.into_state()),
        auth_user(&tutor),
        AppJson(UpdateProfileRequest {
            email: Some("taken@example.com".to_string()),
            ..UpdateProfileRequest::default()
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_current_password_is_a_field_error() {
    let student = user(Role::Student);
    let stored = hash_password("old-password").unwrap();

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_password_hash()
        .returning(move |_| Ok(Some(stored.clone())));
    ctx.users.expect_update_user().never();

    let err = change_password(
        State(ctx.into_state()),
        auth_user(&student),
        AppJson(ChangePasswordRequest {
            current_password: "not-it".to_string(),
            new_password: "new-password".to_string(),
        }),
    )
    .await
    .unwrap_err();

    let HalaqaError::Validation(errors) = err.0 else {
        panic!("expected a validation error");
    };
    assert_eq!(errors.fields()[0].field, "currentPassword");
}

#[tokio::test]
async fn password_change_stores_a_new_hash() {
    let student = user(Role::Student);
    let student_id = student.id;
    let stored = hash_password("old-password").unwrap();
    let unchanged = student.clone();

    let mut ctx = TestContext::new();
    ctx.users
        .expect_get_password_hash()
        .returning(move |_| Ok(Some(stored.clone())));
    ctx.users
        .expect_update_user()
        .withf(move |id, changes| {
            *id == student_id
                && changes
                    .password_hash
                    .as_deref()
                    .is_some_and(|hash| verify_password("new-password", hash).unwrap_or(false))
        })
        .times(1)
        .returning(move |_, _| Ok(Some(unchanged.clone())));

    let status = change_password(
        State(ctx.into_state()),
        auth_user(&student),
        AppJson(ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
}
