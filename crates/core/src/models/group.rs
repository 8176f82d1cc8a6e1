use std::{collections::HashSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{self, GROUP_NAME_MAX, ValidationErrors};

/// Lifecycle of a study group.
///
/// Transitions are manual only and unrestricted: any status may move to any
/// other, including back from `Completed`. Who may trigger a transition is
/// decided by [`crate::authz`], not here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    #[default]
    Active,
    Inactive,
    Completed,
}

impl GroupStatus {
    pub const ALL: [GroupStatus; 3] = [
        GroupStatus::Active,
        GroupStatus::Inactive,
        GroupStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Active => "ACTIVE",
            GroupStatus::Inactive => "INACTIVE",
            GroupStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(GroupStatus::Active),
            "INACTIVE" => Ok(GroupStatus::Inactive),
            "COMPLETED" => Ok(GroupStatus::Completed),
            other => Err(format!("unknown group status: {other}")),
        }
    }
}

pub const MAX_DURATION_MINUTES: i32 = 24 * 60;

/// One weekly meeting slot. `day_of_week` counts from Sunday = 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub day_of_week: u8,
    pub time: String,
    pub duration_minutes: i32,
}

impl ScheduleDay {
    fn check(&self, errors: &mut ValidationErrors, index: usize) {
        let prefix = format!("scheduleDays[{index}]");
        if self.day_of_week > 6 {
            errors.push(format!("{prefix}.dayOfWeek"), "must be between 0 and 6");
        }
        validation::check_time(errors, &format!("{prefix}.time"), &self.time);
        if self.duration_minutes <= 0 {
            errors.push(format!("{prefix}.durationMinutes"), "must be positive");
        } else if self.duration_minutes > MAX_DURATION_MINUTES {
            errors.push(
                format!("{prefix}.durationMinutes"),
                format!("must be at most {MAX_DURATION_MINUTES}"),
            );
        }
    }
}

pub fn check_schedule_days(errors: &mut ValidationErrors, days: &[ScheduleDay]) {
    for (index, day) in days.iter().enumerate() {
        day.check(errors, index);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tutor_id: Uuid,
    pub status: GroupStatus,
    pub schedule_days: Vec<ScheduleDay>,
    /// Roster of STUDENT user ids.
    pub students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn has_student(&self, student_id: Uuid) -> bool {
        self.students.contains(&student_id)
    }
}

fn check_group_name(errors: &mut ValidationErrors, name: &str) {
    let len = name.trim().chars().count();
    if len == 0 {
        errors.push("name", "is required");
    } else if len > GROUP_NAME_MAX {
        errors.push("name", format!("must be less than {GROUP_NAME_MAX} characters"));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    pub tutor_id: Uuid,
    pub status: Option<GroupStatus>,
    #[serde(default)]
    pub schedule_days: Vec<ScheduleDay>,
    #[serde(default)]
    pub students: Vec<Uuid>,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_group_name(&mut errors, &self.name);
        check_schedule_days(&mut errors, &self.schedule_days);
        let mut seen = HashSet::new();
        for (index, student) in self.students.iter().enumerate() {
            if !seen.insert(student) {
                errors.push(format!("students[{index}]"), "is listed more than once");
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tutor_id: Option<Uuid>,
    pub status: Option<GroupStatus>,
    pub schedule_days: Option<Vec<ScheduleDay>>,
}

impl UpdateGroupRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_group_name(&mut errors, name);
        }
        if let Some(days) = &self.schedule_days {
            check_schedule_days(&mut errors, days);
        }
        errors.into_result()
    }
}

/// The fully-resolved set of column changes applied to a stored group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tutor_id: Option<Uuid>,
    pub status: Option<GroupStatus>,
    pub schedule_days: Option<Vec<ScheduleDay>>,
}

impl From<UpdateGroupRequest> for GroupChanges {
    fn from(request: UpdateGroupRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            tutor_id: request.tutor_id,
            status: request.status,
            schedule_days: request.schedule_days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupStatusRequest {
    pub status: GroupStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStudentRequest {
    pub student_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFilter {
    pub status: Option<GroupStatus>,
    pub tutor_id: Option<Uuid>,
    /// Only groups whose roster contains this student.
    pub student_id: Option<Uuid>,
    pub search: Option<String>,
}
