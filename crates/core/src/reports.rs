//! Attendance statistics.
//!
//! Everything here is a pure function over already-loaded records; the API
//! layer decides which records a caller may see before calling in.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    attendance::{AttendanceHistoryItem, AttendanceStatus},
    group::Group,
    report::{DashboardStats, GroupReport, StudentReport},
    session::Session,
};

/// How many of the latest sessions are inspected for a missed streak.
pub const STREAK_WINDOW: usize = 5;

/// A streak at or above this length flags a student for follow-up.
pub const FOLLOW_UP_STREAK: usize = 2;

/// Rounded share of present records, 0 for an empty set.
pub fn percentage<I>(statuses: I) -> u32
where
    I: IntoIterator<Item = AttendanceStatus>,
{
    let (present, total) = statuses
        .into_iter()
        .fold((0u64, 0u64), |(present, total), status| {
            (present + u64::from(status.counts_as_present()), total + 1)
        });
    if total == 0 {
        return 0;
    }
    // round-half-up in integer arithmetic
    ((200 * present + total) / (2 * total)) as u32
}

/// Consecutive `Missed` records counted from the most recent session
/// backwards, looking at no more than [`STREAK_WINDOW`] sessions.
pub fn missed_streak(history: &[AttendanceHistoryItem]) -> usize {
    let mut recent: Vec<&AttendanceHistoryItem> = history.iter().collect();
    recent.sort_by(|a, b| b.session_date.cmp(&a.session_date));
    recent
        .into_iter()
        .take(STREAK_WINDOW)
        .take_while(|item| item.status == AttendanceStatus::Missed)
        .count()
}

pub fn student_report(
    student_id: Uuid,
    name: &str,
    group_id: Option<Uuid>,
    history: &[AttendanceHistoryItem],
) -> StudentReport {
    let count = |wanted: AttendanceStatus| history.iter().filter(|i| i.status == wanted).count();
    let streak = missed_streak(history);
    StudentReport {
        student_id,
        name: name.to_string(),
        group_id,
        total: history.len(),
        attended: count(AttendanceStatus::Attended),
        missed: count(AttendanceStatus::Missed),
        excused: count(AttendanceStatus::Excused),
        percentage: percentage(history.iter().map(|i| i.status)),
        missed_streak: streak,
        needs_follow_up: streak >= FOLLOW_UP_STREAK,
    }
}

/// Group-level percentage over the union of its students' records.
pub fn group_report(
    group: &Group,
    sessions: &[Session],
    history: &[AttendanceHistoryItem],
) -> GroupReport {
    let statuses = history
        .iter()
        .filter(|item| group.has_student(item.student_id))
        .map(|item| item.status);
    GroupReport {
        group_id: group.id,
        name: group.name.clone(),
        tutor_id: group.tutor_id,
        student_count: group.students.len(),
        total_sessions: sessions.iter().filter(|s| s.group_id == group.id).count(),
        percentage: percentage(statuses),
    }
}

/// Sorts rows by descending percentage. Ties keep their input order.
pub fn rank_by_percentage<T, F>(rows: &mut [T], percentage_of: F)
where
    F: Fn(&T) -> u32,
{
    rows.sort_by(|a, b| percentage_of(b).cmp(&percentage_of(a)));
}

pub fn dashboard_stats(
    groups: &[Group],
    sessions: &[Session],
    history: &[AttendanceHistoryItem],
    today: NaiveDate,
) -> DashboardStats {
    let students: HashSet<Uuid> = groups
        .iter()
        .flat_map(|g| g.students.iter().copied())
        .collect();
    let students_needing_follow_up = students
        .iter()
        .filter(|student_id| {
            let own: Vec<AttendanceHistoryItem> = history
                .iter()
                .filter(|item| item.student_id == **student_id)
                .cloned()
                .collect();
            missed_streak(&own) >= FOLLOW_UP_STREAK
        })
        .count();

    DashboardStats {
        total_groups: groups.len(),
        total_students: students.len(),
        total_sessions: sessions.len(),
        today_sessions: sessions.iter().filter(|s| s.date == today).count(),
        students_needing_follow_up,
    }
}
