use std::collections::HashMap;

use actix_web::{get, web, Responder};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    activity::{self, Activity, RenderedActivity},
    auth::Session,
    consts::{DASHBOARD_ACTIVITY_LIMIT, RECENT_PAYROLL_DAYS},
    entity::{attendance, employee, payroll, prelude::*, sea_orm_active_enums::{AttendanceStatus, EmploymentStatus}, task},
    error::ServiceError,
    payroll::{net_pay, PayBasis},
};

use super::tasks::is_overdue;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_dashboard)
        .service(get_activities);
}

#[derive(Debug, Serialize)]
struct DashboardStats {
    total_employees: usize,
    active_employees: usize,
    total_projects: u64,
    total_tasks: usize,
    completed_tasks: usize,
    pending_tasks: usize,
    overdue_tasks: usize,
    today_present: usize,
    today_absent: usize,
    /// Present share of today's records, as a rounded percentage
    attendance_rate: usize,
    recent_payrolls: usize,
    total_payroll_amount: Decimal,
    recent_activities: Vec<RenderedActivity>,
}

struct Snapshot {
    employees: Vec<employee::Model>,
    total_projects: u64,
    tasks: Vec<task::Model>,
    today_attendance: Vec<attendance::Model>,
    payrolls: Vec<payroll::Model>,
}

fn by_id(employees: &[employee::Model]) -> HashMap<Uuid, &employee::Model> {
    employees.iter().map(|employee| (employee.id, employee)).collect()
}

fn compute(snapshot: Snapshot, now: DateTime<FixedOffset>) -> Result<DashboardStats, ServiceError> {
    let today = now.date_naive();
    let employees = by_id(&snapshot.employees);

    let completed_tasks = snapshot.tasks.iter().filter(|task| task.is_completed).count();
    let overdue_tasks = snapshot.tasks.iter().filter(|task| is_overdue(task, today)).count();

    let today_present = snapshot.today_attendance.iter().filter(|row| row.status == AttendanceStatus::Present).count();
    let today_absent = snapshot.today_attendance.len() - today_present;
    let attendance_rate = match snapshot.today_attendance.len() {
        0 => 0,
        total => (today_present * 100 + total / 2) / total,
    };

    let week_ago = now - Duration::days(RECENT_PAYROLL_DAYS as i64);
    let recent_payrolls = snapshot.payrolls.iter().filter(|payroll| payroll.generated_on >= week_ago).count();

    let mut total_payroll_amount = Decimal::ZERO;
    for payroll in &snapshot.payrolls {
        if let Some(employee) = employees.get(&payroll.employee_id) {
            total_payroll_amount += net_pay(employee.salary_type, employee.salary_rate, PayBasis::from(payroll))?;
        }
    }

    let recent_activities = activity::feed(
        collect_activities(&snapshot.employees, &snapshot.tasks, &snapshot.payrolls, &[]),
        Some(DASHBOARD_ACTIVITY_LIMIT),
    );

    Ok(DashboardStats {
        total_employees: snapshot.employees.len(),
        active_employees: snapshot.employees.iter().filter(|employee| employee.employment_status == EmploymentStatus::Active).count(),
        total_projects: snapshot.total_projects,
        total_tasks: snapshot.tasks.len(),
        completed_tasks,
        pending_tasks: snapshot.tasks.len() - completed_tasks,
        overdue_tasks,
        today_present,
        today_absent,
        attendance_rate,
        recent_payrolls,
        total_payroll_amount,
        recent_activities,
    })
}

fn collect_activities(
    employees: &[employee::Model],
    tasks: &[task::Model],
    payrolls: &[payroll::Model],
    attendance: &[attendance::Model],
) -> Vec<Activity> {
    let names = by_id(employees);
    let lookup = |id: &Uuid| names.get(id).copied();

    employees.iter().map(Activity::from)
        .chain(tasks.iter().map(|task| activity::from_task(task, lookup(&task.assigned_to))))
        .chain(payrolls.iter().map(|payroll| activity::from_payroll(payroll, lookup(&payroll.employee_id))))
        .chain(attendance.iter().map(|row| activity::from_attendance(row, lookup(&row.employee_id))))
        .collect()
}

async fn load_employees(db: &DatabaseConnection) -> Result<Vec<employee::Model>, ServiceError> {
    Employee::find()
        .order_by_desc(employee::Column::CreatedAt)
        .all(db).await
        .map_err(|err| ServiceError::store("load employees", err))
}

async fn load_tasks(db: &DatabaseConnection) -> Result<Vec<task::Model>, ServiceError> {
    Task::find()
        .order_by_desc(task::Column::TaskCreated)
        .all(db).await
        .map_err(|err| ServiceError::store("load tasks", err))
}

async fn load_payrolls(db: &DatabaseConnection) -> Result<Vec<payroll::Model>, ServiceError> {
    Payroll::find()
        .order_by_desc(payroll::Column::GeneratedOn)
        .all(db).await
        .map_err(|err| ServiceError::store("load payroll", err))
}

async fn load_attendance_on(db: &DatabaseConnection, date: NaiveDate) -> Result<Vec<attendance::Model>, ServiceError> {
    Attendance::find()
        .filter(attendance::Column::Date.eq(date))
        .all(db).await
        .map_err(|err| ServiceError::store("load attendance", err))
}

#[get("/dashboard")]
async fn get_dashboard(db: web::Data<DatabaseConnection>, _session: Session) -> Result<impl Responder, ServiceError> {
    let now = Local::now().fixed_offset();

    let snapshot = Snapshot {
        employees: load_employees(db.get_ref()).await?,
        total_projects: Project::find()
            .count(db.get_ref()).await
            .map_err(|err| ServiceError::store("count projects", err))?,
        tasks: load_tasks(db.get_ref()).await?,
        today_attendance: load_attendance_on(db.get_ref(), now.date_naive()).await?,
        payrolls: load_payrolls(db.get_ref()).await?,
    };

    Ok(web::Json(compute(snapshot, now)?))
}

#[derive(Debug, Serialize, Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
}

#[get("/activities")]
async fn get_activities(db: web::Data<DatabaseConnection>, _session: Session, query: web::Query<ActivityQuery>) -> Result<impl Responder, ServiceError> {
    let employees = load_employees(db.get_ref()).await?;
    let tasks = load_tasks(db.get_ref()).await?;
    let payrolls = load_payrolls(db.get_ref()).await?;
    let attendance = Attendance::find()
        .order_by_desc(attendance::Column::CreatedAt)
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load attendance", err))?;

    let activities = collect_activities(&employees, &tasks, &payrolls, &attendance);

    Ok(web::Json(activity::feed(activities, query.limit)))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use crate::{
        activity::ActivityKind,
        auth::{tests::{bearer, SECRET}, Authority, RoleType},
        entity::sea_orm_active_enums::SalaryType,
        ledger::tests::record,
        pages::tasks::tests::open_task,
        payroll::tests::{employee, stored_payroll},
    };

    use super::*;

    #[actix_web::test]
    async fn test_compute() {
        let now = Local::now().fixed_offset();
        let today = now.date_naive();

        let daily = employee(SalaryType::Daily, dec!(500));
        let mut monthly = employee(SalaryType::Monthly, dec!(16000));
        monthly.employment_status = EmploymentStatus::OnLeave;

        let mut old_payroll = stored_payroll(monthly.id, 20, 0, dec!(160));
        old_payroll.generated_on = now - Duration::days(30);

        let mut done = open_task(daily.id, today);
        done.is_completed = true;

        let mut present = record(daily.id, 0, AttendanceStatus::Present, dec!(8));
        present.date = today;
        let mut absent = record(monthly.id, 0, AttendanceStatus::Absent, dec!(0));
        absent.date = today;

        let stats = compute(Snapshot {
            total_projects: 2,
            tasks: vec![ done, open_task(daily.id, today - Duration::days(2)), open_task(monthly.id, today) ],
            today_attendance: vec![ present.clone(), present, absent ],
            payrolls: vec![ stored_payroll(daily.id, 5, 0, dec!(40)), old_payroll ],
            employees: vec![ daily, monthly ],
        }, now).unwrap();

        assert_eq!(stats.total_employees, 2);
        assert_eq!(stats.active_employees, 1);
        assert_eq!(stats.total_projects, 2);
        assert_eq!((stats.total_tasks, stats.completed_tasks, stats.pending_tasks, stats.overdue_tasks), (3, 1, 2, 1));
        assert_eq!((stats.today_present, stats.today_absent, stats.attendance_rate), (2, 1, 67));
        assert_eq!(stats.recent_payrolls, 1);
        assert_eq!(stats.total_payroll_amount, dec!(18500));
        assert!(stats.recent_activities.len() <= DASHBOARD_ACTIVITY_LIMIT);
    }

    #[actix_web::test]
    async fn test_compute_without_attendance() {
        let stats = compute(Snapshot {
            employees: Vec::new(),
            total_projects: 0,
            tasks: Vec::new(),
            today_attendance: Vec::new(),
            payrolls: Vec::new(),
        }, Local::now().fixed_offset()).unwrap();

        assert_eq!(stats.attendance_rate, 0);
        assert_eq!(stats.total_payroll_amount, Decimal::ZERO);
        assert!(stats.recent_activities.is_empty());
    }

    #[actix_web::test]
    async fn test_get_activities() {
        let alice = employee(SalaryType::Daily, dec!(500));
        let mut marked = record(alice.id, 0, AttendanceStatus::Present, dec!(8));
        marked.created_at = alice.created_at + Duration::hours(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ alice.clone() ],
            ])
            .append_query_results([
                Vec::<task::Model>::new(),
            ])
            .append_query_results([
                Vec::<payroll::Model>::new(),
            ])
            .append_query_results([
                vec![ marked ],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .configure(config)
        ).await;

        let req = test::TestRequest::default()
            .uri("/activities")
            .insert_header(bearer(RoleType::Staff))
            .to_request();

        let feed: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0]["kind"], serde_json::to_value(ActivityKind::AttendanceMarked { status: AttendanceStatus::Present }).unwrap());
        assert_eq!(feed[0]["icon"], "calendar");
        assert_eq!(feed[1]["message"], "New employee Alice joined the company");
    }
}
