/// Assumed working hours in a month, used to turn a monthly salary into an hourly rate
pub const HOURS_PER_MONTH: i64 = 160;

pub const MAX_HOURS_PER_DAY: i64 = 24;

/// Look-back window of the per-employee attendance stats
pub const ATTENDANCE_STATS_DAYS: u64 = 60;

pub const RECENT_PAYROLL_DAYS: u64 = 7;

pub const DASHBOARD_ACTIVITY_LIMIT: usize = 5;

pub const APPOINTMENT_DURATION_MINUTES: i64 = 60;
