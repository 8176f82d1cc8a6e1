use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::NaiveDate;
use halaqa_api::{
    handlers::reports::{StudentReportQuery, dashboard, group_reports, student_reports},
    middleware::extract::AppQuery,
};
use halaqa_core::models::{
    attendance::{AttendanceHistoryItem, AttendanceStatus},
    session::SessionStatus,
    user::{Role, User},
};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::test_utils::{TestContext, auth_user, days_from_today, group, session, user};

use AttendanceStatus::*;

fn item(group_id: Uuid, student_id: Uuid, session_date: NaiveDate, status: AttendanceStatus) -> AttendanceHistoryItem {
    AttendanceHistoryItem {
        session_id: Uuid::new_v4(),
        group_id,
        student_id,
        session_date,
        status,
    }
}

#[tokio::test]
async fn tutors_and_students_cannot_see_reports() {
    for role in [Role::Tutor, Role::Student] {
        let caller = user(role);
        let ctx = TestContext::new();

        let err = student_reports(
            State(ctx.into_state()),
            auth_user(&caller),
            AppQuery(StudentReportQuery::default()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}

#[test_log::test(tokio::test)]
async fn student_reports_are_ranked_and_flag_streaks() {
    let moderator = user(Role::Moderator);
    let steady = user(Role::Student);
    let slipping = user(Role::Student);
    let g1 = group(Uuid::new_v4(), vec![slipping.id, steady.id]);
    let g1_id = g1.id;

    let d = |days: i64| days_from_today(-days);
    let history = vec![
        item(g1_id, steady.id, d(14), Attended),
        item(g1_id, steady.id, d(7), Attended),
        item(g1_id, steady.id, d(0), Excused),
        item(g1_id, slipping.id, d(14), Attended),
        item(g1_id, slipping.id, d(7), Missed),
        item(g1_id, slipping.id, d(0), Missed),
    ];

    let mut ctx = TestContext::new();
    ctx.groups
        .expect_all_groups()
        .returning(move |_| Ok(vec![g1.clone()]));
    let people: Vec<User> = vec![steady.clone(), slipping.clone()];
    ctx.users
        .expect_get_users()
        .returning(move |_| Ok(people.clone()));
    ctx.attendance
        .expect_history_for_students()
        .withf(|ids| ids.len() == 2)
        .returning(move |_| Ok(history.clone()));

    let Json(rows) = student_reports(
        State(ctx.into_state()),
        auth_user(&moderator),
        AppQuery(StudentReportQuery::default()),
    )
    .await
    .unwrap();

    let order: Vec<Uuid> = rows.iter().map(|r| r.student_id).collect();
    assert_eq!(order, vec![steady.id, slipping.id]);

    assert_eq!(rows[0].percentage, 67);
    assert!(!rows[0].needs_follow_up);

    assert_eq!(rows[1].name, slipping.name);
    assert_eq!(rows[1].percentage, 33);
    assert_eq!(rows[1].missed_streak, 2);
    assert!(rows[1].needs_follow_up);
}

#[tokio::test]
async fn group_filter_narrows_history() {
    let admin = user(Role::Admin);
    let student = user(Role::Student);
    let g1 = group(Uuid::new_v4(), vec![student.id]);
    let g1_id = g1.id;
    let elsewhere = Uuid::new_v4();

    let history = vec![
        item(g1_id, student.id, days_from_today(-7), Attended),
        item(elsewhere, student.id, days_from_today(-6), Missed),
    ];

    let mut ctx = TestContext::new();
    ctx.groups
        .expect_get_group()
        .returning(move |_| Ok(Some(g1.clone())));
    let people = vec![student.clone()];
    ctx.users
        .expect_get_users()
        .returning(move |_| Ok(people.clone()));
    ctx.attendance
        .expect_history_for_students()
        .returning(move |_| Ok(history.clone()));

    let Json(rows) = student_reports(
        State(ctx.into_state()),
        auth_user(&admin),
        AppQuery(StudentReportQuery {
            group_id: Some(g1_id),
        }),
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group_id, Some(g1_id));
    assert_eq!(rows[0].total, 1);
    assert_eq!(rows[0].percentage, 100);
}

#[tokio::test]
async fn group_reports_count_held_sessions() {
    let admin = user(Role::Admin);
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let g1 = group(Uuid::new_v4(), vec![a, b]);
    let g2 = group(Uuid::new_v4(), vec![]);
    let (g1_id, g2_id) = (g1.id, g2.id);

    let held = vec![
        session(g1_id, days_from_today(-7), SessionStatus::Completed),
        session(g1_id, days_from_today(0), SessionStatus::Completed),
    ];
    let history = vec![
        item(g1_id, a, days_from_today(-7), Attended),
        item(g1_id, b, days_from_today(-7), Missed),
        item(g1_id, a, days_from_today(0), Attended),
        item(g1_id, b, days_from_today(0), Attended),
    ];

    let mut ctx = TestContext::new();
    ctx.groups
        .expect_all_groups()
        .returning(move |_| Ok(vec![g2.clone(), g1.clone()]));
    ctx.sessions
        .expect_list_sessions()
        .withf(|_, filter| filter.status == Some(SessionStatus::Completed))
        .returning(move |_, _| Ok(held.clone()));
    ctx.attendance
        .expect_history_for_students()
        .returning(move |_| Ok(history.clone()));

    let Json(rows) = group_reports(State(ctx.into_state()), auth_user(&admin))
        .await
        .unwrap();

    assert_eq!(rows[0].group_id, g1_id);
    assert_eq!(rows[0].total_sessions, 2);
    assert_eq!(rows[0].student_count, 2);
    assert_eq!(rows[0].percentage, 75);

    assert_eq!(rows[1].group_id, g2_id);
    assert_eq!(rows[1].percentage, 0);
}

#[tokio::test]
async fn tutor_dashboard_covers_only_own_groups() {
    let t1 = user(Role::Tutor);
    let t1_id = t1.id;
    let student = Uuid::new_v4();
    let g1 = group(t1_id, vec![student]);
    let g1_id = g1.id;

    let sessions = vec![
        session(g1_id, days_from_today(0), SessionStatus::Scheduled),
        session(g1_id, days_from_today(-7), SessionStatus::Completed),
        session(g1_id, days_from_today(0), SessionStatus::Canceled),
    ];
    let history = vec![
        item(g1_id, student, days_from_today(-14), Missed),
        item(g1_id, student, days_from_today(-7), Missed),
    ];

    let mut ctx = TestContext::new();
    ctx.groups
        .expect_all_groups()
        .withf(move |filter| filter.tutor_id == Some(t1_id))
        .times(1)
        .returning(move |_| Ok(vec![g1.clone()]));
    ctx.sessions
        .expect_list_sessions()
        .withf(move |ids, _| ids.to_vec() == vec![g1_id])
        .returning(move |_, _| Ok(sessions.clone()));
    ctx.attendance
        .expect_history_for_students()
        .returning(move |_| Ok(history.clone()));

    let Json(stats) = dashboard(State(ctx.into_state()), auth_user(&t1)).await.unwrap();

    assert_eq!(stats.total_groups, 1);
    assert_eq!(stats.total_students, 1);
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.today_sessions, 1);
    assert_eq!(stats.students_needing_follow_up, 1);
}

#[tokio::test]
async fn students_have_no_dashboard() {
    let student = user(Role::Student);
    let mut ctx = TestContext::new();
    ctx.groups.expect_all_groups().never();

    let err = dashboard(State(ctx.into_state()), auth_user(&student))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}
