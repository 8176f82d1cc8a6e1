use std::{collections::HashSet, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::session::Session, validation::ValidationErrors};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    #[default]
    Attended,
    Missed,
    Excused,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] = [
        AttendanceStatus::Attended,
        AttendanceStatus::Missed,
        AttendanceStatus::Excused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Attended => "ATTENDED",
            AttendanceStatus::Missed => "MISSED",
            AttendanceStatus::Excused => "EXCUSED",
        }
    }

    /// Whether the status counts towards the attendance percentage.
    pub fn counts_as_present(&self) -> bool {
        matches!(self, AttendanceStatus::Attended)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATTENDED" => Ok(AttendanceStatus::Attended),
            "MISSED" => Ok(AttendanceStatus::Missed),
            "EXCUSED" => Ok(AttendanceStatus::Excused),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One student's line on an attendance sheet, as submitted or prefilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_finalize() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendanceRequest {
    pub records: Vec<AttendanceEntry>,
    /// Complete the session after saving. `false` keeps a draft.
    #[serde(default = "default_finalize")]
    pub finalize: bool,
}

impl SubmitAttendanceRequest {
    /// Every submitted student must be on the roster and appear once.
    pub fn validate_roster(&self, roster: &[Uuid]) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut seen = HashSet::new();
        for (index, entry) in self.records.iter().enumerate() {
            if !roster.contains(&entry.student_id) {
                errors.push(
                    format!("records[{index}].studentId"),
                    "is not enrolled in this group",
                );
            }
            if !seen.insert(entry.student_id) {
                errors.push(
                    format!("records[{index}].studentId"),
                    "is listed more than once",
                );
            }
        }
        errors.into_result()
    }

    /// Turns a checked submission into the exact set of rows to store.
    ///
    /// A draft stores only what was sent. When finalizing, roster students
    /// absent from the submission keep their saved draft line or fall back
    /// to the optimistic `Attended` default.
    pub fn sheet(&self, roster: &[Uuid], existing: &[AttendanceRecord]) -> Vec<AttendanceEntry> {
        if !self.finalize {
            return self.records.clone();
        }

        let mut sheet = prefill_sheet(roster, existing);
        for line in sheet.iter_mut() {
            if let Some(submitted) = self
                .records
                .iter()
                .find(|entry| entry.student_id == line.student_id)
            {
                line.status = submitted.status;
                line.notes = submitted.notes.clone();
            }
        }
        sheet
    }
}

/// Students with a saved line who are no longer on the roster.
pub fn off_roster(roster: &[Uuid], existing: &[AttendanceRecord]) -> Vec<Uuid> {
    existing
        .iter()
        .map(|record| record.student_id)
        .filter(|student_id| !roster.contains(student_id))
        .collect()
}

/// Builds the record-by-exception sheet for a roster: saved lines are kept,
/// everyone else starts as `Attended`.
pub fn prefill_sheet(roster: &[Uuid], existing: &[AttendanceRecord]) -> Vec<AttendanceEntry> {
    roster
        .iter()
        .map(|student_id| {
            match existing.iter().find(|record| record.student_id == *student_id) {
                Some(record) => AttendanceEntry {
                    student_id: *student_id,
                    status: record.status,
                    notes: record.notes.clone(),
                },
                None => AttendanceEntry {
                    student_id: *student_id,
                    status: AttendanceStatus::Attended,
                    notes: None,
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub session: Session,
    pub entries: Vec<AttendanceEntry>,
    /// True once the session is terminal and the sheet can no longer change.
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendanceResponse {
    pub session: Session,
    pub records: Vec<AttendanceRecord>,
    pub percentage: u32,
}

/// An attendance row joined with the date of its session, used by reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistoryItem {
    pub session_id: Uuid,
    pub group_id: Uuid,
    pub student_id: Uuid,
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
}
