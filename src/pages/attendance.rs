use actix_web::{delete, dev, get, post, put, web, FromRequest, HttpRequest, HttpResponse, Responder};
use chrono::{Datelike as _, Local, NaiveDate};
use futures_util::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Session,
    consts::ATTENDANCE_STATS_DAYS,
    entity::{attendance, employee, prelude::*, sea_orm_active_enums::AttendanceStatus},
    error::ServiceError,
    ledger::{self, AttendanceStats, NewAttendance},
    utils,
};

use extractor::UnpaidAttendance;
use model::*;

mod extractor;
mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(create_attendance)
        .service(check_duplicate)
        .service(get_stats)
        .service(get_employee_attendance)
        .service(get_unpaid_attendance)
        .service(get_monthly_record)
        .service(get_attendance)
        .service(update_attendance)
        .service(delete_attendance);
}

#[post("")]
async fn create_attendance(db: web::Data<DatabaseConnection>, _session: Session, payload: web::Json<NewAttendance>) -> Result<impl Responder, ServiceError> {
    let attendance = ledger::insert(db.get_ref(), payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(web::Json(attendance)))
}

#[get("/check")]
async fn check_duplicate(db: web::Data<DatabaseConnection>, _session: Session, query: web::Query<DuplicateQuery>) -> Result<impl Responder, ServiceError> {
    let editing = match query.editing {
        Some(id) => Some(
            Attendance::find_by_id(id)
                .one(db.get_ref()).await
                .map_err(|err| ServiceError::store("load attendance", err))?
                .ok_or(ServiceError::NotFound)?
        ),
        None => None,
    };

    let duplicate = ledger::check_duplicate(db.get_ref(), query.employee_id, query.date, editing.as_ref()).await?;

    Ok(web::Json(DuplicateCheck { duplicate }))
}

#[get("/stats")]
async fn get_stats(db: web::Data<DatabaseConnection>, _session: Session) -> Result<impl Responder, ServiceError> {
    let since = utils::days_before(Local::now().date_naive(), ATTENDANCE_STATS_DAYS);

    let employees = Employee::find()
        .order_by_asc(employee::Column::Name)
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load employees", err))?;

    let mut stats = ledger::stats_since(db.get_ref(), since).await?;

    let res = employees.into_iter()
        .map(|employee| EmployeeAttendanceStats {
            stats: stats.remove(&employee.id).unwrap_or_default(),
            employee,
        })
        .collect::<Vec<_>>();

    Ok(web::Json(res))
}

#[get("/employee/{employee_id}")]
async fn get_employee_attendance(db: web::Data<DatabaseConnection>, _session: Session, employee: employee::Model) -> Result<impl Responder, ServiceError> {
    Ok(web::Json(ledger::history(db.get_ref(), employee.id).await?))
}

#[get("/employee/{employee_id}/unpaid")]
async fn get_unpaid_attendance(db: web::Data<DatabaseConnection>, _session: Session, employee: employee::Model) -> Result<impl Responder, ServiceError> {
    Ok(web::Json(ledger::unpaid_for(db.get_ref(), employee.id).await?))
}

#[get("/employee/{employee_id}/monthly")]
async fn get_monthly_record(db: web::Data<DatabaseConnection>, _session: Session, employee: employee::Model, query: web::Query<MonthQuery>) -> Result<impl Responder, ServiceError> {
    let today = Local::now().date_naive();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    Ok(web::Json(ledger::monthly_totals(db.get_ref(), employee.id, year, month).await?))
}

#[get("/{attendance_id}")]
async fn get_attendance(_session: Session, attendance: attendance::Model) -> impl Responder {
    web::Json(ledger::AttendanceEntry::from(attendance))
}

#[put("/{attendance_id}")]
async fn update_attendance(db: web::Data<DatabaseConnection>, _session: Session, attendance: UnpaidAttendance, payload: web::Json<NewAttendance>) -> Result<impl Responder, ServiceError> {
    let attendance = ledger::update(db.get_ref(), &attendance, payload.into_inner()).await?;

    Ok(web::Json(attendance))
}

#[delete("/{attendance_id}")]
async fn delete_attendance(db: web::Data<DatabaseConnection>, _session: Session, attendance: UnpaidAttendance) -> Result<impl Responder, ServiceError> {
    ledger::delete(db.get_ref(), attendance.id).await?;

    Ok(HttpResponse::NoContent().finish())
}
