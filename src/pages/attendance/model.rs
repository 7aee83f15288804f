use super::*;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct DuplicateQuery {
    pub(super) employee_id: Uuid,
    pub(super) date: NaiveDate,
    /// Record being edited, which never counts as its own duplicate
    pub(super) editing: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct DuplicateCheck {
    pub(super) duplicate: Option<attendance::Model>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MonthQuery {
    pub(super) year: Option<i32>,
    pub(super) month: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct EmployeeAttendanceStats {
    #[serde(flatten)]
    pub(super) employee: employee::Model,
    #[serde(flatten)]
    pub(super) stats: AttendanceStats,
}
