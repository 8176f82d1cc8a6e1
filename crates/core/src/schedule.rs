//! Session materialization from a group's weekly schedule.
//!
//! Given the recurrence rule (`schedule_days`) and a date window, produce
//! one slot per calendar date on which the group meets. Slots are keyed by
//! date so the store can insert them with `ON CONFLICT DO NOTHING` and a
//! rerun over an overlapping window never duplicates a session.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::{
    errors::{HalaqaError, HalaqaResult},
    models::{group::ScheduleDay, session::NewSession},
    validation::{ValidationErrors, parse_hh_mm},
};

/// Longest window a single generation request may cover.
pub const MAX_WINDOW_DAYS: i64 = 366;

fn check_window(from: NaiveDate, to: NaiveDate) -> HalaqaResult<()> {
    let mut errors = ValidationErrors::new();
    if from > to {
        errors.push("to", "must not be before from");
    } else if (to - from).num_days() + 1 > MAX_WINDOW_DAYS {
        errors.push("to", format!("window may span at most {MAX_WINDOW_DAYS} days"));
    }
    errors.into_result().map_err(HalaqaError::from)
}

/// Expands `schedule_days` over `[from, to]` (inclusive).
///
/// When several entries fall on the same weekday the earliest time wins,
/// since a group has at most one session per date.
pub fn materialize(
    group_id: Uuid,
    schedule_days: &[ScheduleDay],
    from: NaiveDate,
    to: NaiveDate,
) -> HalaqaResult<Vec<NewSession>> {
    check_window(from, to)?;

    let mut by_weekday: BTreeMap<u32, &ScheduleDay> = BTreeMap::new();
    for day in schedule_days {
        let minutes = parse_hh_mm(&day.time).unwrap_or(u32::MAX);
        by_weekday
            .entry(u32::from(day.day_of_week))
            .and_modify(|current| {
                if minutes < parse_hh_mm(&current.time).unwrap_or(u32::MAX) {
                    *current = day;
                }
            })
            .or_insert(day);
    }

    Ok(from
        .iter_days()
        .take_while(|date| *date <= to)
        .filter_map(|date| {
            by_weekday
                .get(&date.weekday().num_days_from_sunday())
                .map(|day| NewSession {
                    group_id,
                    date,
                    time: day.time.clone(),
                    notes: None,
                })
        })
        .collect())
}
