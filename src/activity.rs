//! Activity feed assembled from employee, task, payroll and attendance rows

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{attendance, employee, payroll, sea_orm_active_enums::AttendanceStatus, task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    EmployeeJoined,
    TaskAssigned,
    TaskCompleted,
    PayrollGenerated,
    AttendanceMarked { status: AttendanceStatus },
}

impl ActivityKind {
    pub fn icon(self) -> &'static str {
        match self {
            ActivityKind::EmployeeJoined => "users",
            ActivityKind::TaskAssigned => "alert-circle",
            ActivityKind::TaskCompleted => "check-circle",
            ActivityKind::PayrollGenerated => "dollar-sign",
            ActivityKind::AttendanceMarked { .. } => "calendar",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ActivityKind::EmployeeJoined => "blue",
            ActivityKind::TaskAssigned => "orange",
            ActivityKind::TaskCompleted => "green",
            ActivityKind::PayrollGenerated => "purple",
            ActivityKind::AttendanceMarked { status: AttendanceStatus::Present } => "green",
            ActivityKind::AttendanceMarked { status: AttendanceStatus::Absent } => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub details: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// Activity with its display metadata resolved, as handed to clients
#[derive(Debug, Clone, Serialize)]
pub struct RenderedActivity {
    #[serde(flatten)]
    pub activity: Activity,
    pub icon: &'static str,
    pub color: &'static str,
}

impl From<Activity> for RenderedActivity {
    fn from(activity: Activity) -> Self {
        Self {
            icon: activity.kind.icon(),
            color: activity.kind.color(),
            activity,
        }
    }
}

fn name_of(employee: Option<&employee::Model>) -> &str {
    employee.map(|e| e.name.as_str()).unwrap_or("Unknown")
}

impl From<&employee::Model> for Activity {
    fn from(employee: &employee::Model) -> Self {
        Activity {
            id: employee.id,
            kind: ActivityKind::EmployeeJoined,
            message: format!("New employee {} joined the company", employee.name),
            details: format!("Email: {} • Status: {:?}", employee.email, employee.employment_status),
            timestamp: employee.created_at,
        }
    }
}

pub fn from_task(task: &task::Model, assignee: Option<&employee::Model>) -> Activity {
    if task.is_completed {
        Activity {
            id: task.id,
            kind: ActivityKind::TaskCompleted,
            message: format!("Task \"{}\" completed by {}", task.task_name, name_of(assignee)),
            details: match task.project_id {
                Some(_) => "Project: Assigned to project".to_string(),
                None => "Project: Standalone task".to_string(),
            },
            timestamp: task.completed_at.unwrap_or(task.task_created),
        }
    } else {
        Activity {
            id: task.id,
            kind: ActivityKind::TaskAssigned,
            message: format!("New task \"{}\" assigned to {}", task.task_name, name_of(assignee)),
            details: format!("Deadline: {}", task.task_deadline),
            timestamp: task.task_created,
        }
    }
}

pub fn from_payroll(payroll: &payroll::Model, employee: Option<&employee::Model>) -> Activity {
    Activity {
        id: payroll.id,
        kind: ActivityKind::PayrollGenerated,
        message: format!("Payroll generated for {}", name_of(employee)),
        details: format!("Working days: {} • Hours: {}", payroll.total_working_days, payroll.total_hours),
        timestamp: payroll.generated_on,
    }
}

pub fn from_attendance(attendance: &attendance::Model, employee: Option<&employee::Model>) -> Activity {
    let status = match attendance.status {
        AttendanceStatus::Present => "present",
        AttendanceStatus::Absent => "absent",
    };

    Activity {
        id: attendance.id,
        kind: ActivityKind::AttendanceMarked { status: attendance.status },
        message: format!("{} marked {status}", name_of(employee)),
        details: format!("Date: {} • Hours: {}", attendance.date, attendance.hours_worked),
        timestamp: attendance.created_at,
    }
}

/// Newest first, truncated to `limit` when given
pub fn feed(mut activities: Vec<Activity>, limit: Option<usize>) -> Vec<RenderedActivity> {
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if let Some(limit) = limit {
        activities.truncate(limit);
    }

    activities.into_iter().map(RenderedActivity::from).collect()
}
