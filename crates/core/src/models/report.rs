use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    pub total: usize,
    pub attended: usize,
    pub missed: usize,
    pub excused: usize,
    pub percentage: u32,
    pub missed_streak: usize,
    pub needs_follow_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub group_id: Uuid,
    pub name: String,
    pub tutor_id: Uuid,
    pub student_count: usize,
    pub total_sessions: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_groups: usize,
    pub total_students: usize,
    pub total_sessions: usize,
    pub today_sessions: usize,
    pub students_needing_follow_up: usize,
}
