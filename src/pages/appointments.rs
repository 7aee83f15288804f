use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{Local, NaiveDate, NaiveTime};
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Session,
    calendar::{CalendarEvent, CalendarSync},
    entity::{appointment, employee, prelude::*, sea_orm_active_enums::AppointmentStatus},
    error::ServiceError,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_appointments)
        .service(create_appointment)
        .service(get_appointment)
        .service(update_appointment)
        .service(delete_appointment)
        .service(complete_appointment)
        .service(cancel_appointment);
}

type Calendar = Option<web::Data<dyn CalendarSync>>;

#[derive(Debug, Serialize, Deserialize)]
struct AppointmentForm {
    appointment_name: String,
    appointment_date: NaiveDate,
    appointment_time: NaiveTime,
    assigned_employee: Uuid,
    appointment_info: Option<String>,
    /// Only honoured on edits, new appointments always start active
    appointment_status: Option<AppointmentStatus>,
}

impl AppointmentForm {
    fn validate(self) -> Result<Self, ServiceError> {
        if self.appointment_name.trim().is_empty() {
            return Err(ServiceError::Validation("appointment name is required".to_string()));
        }

        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AppointmentQuery {
    assigned_employee: Option<Uuid>,
}

async fn load_employee(db: &DatabaseConnection, employee_id: Uuid) -> Result<Option<employee::Model>, ServiceError> {
    Employee::find_by_id(employee_id)
        .one(db).await
        .map_err(|err| ServiceError::store("load employee", err))
}

/// Mirrors the appointment to the calendar, returning the event id to store
async fn sync_event(db: &DatabaseConnection, calendar: &dyn CalendarSync, appointment: &appointment::Model) -> Result<String, ServiceError> {
    let employee = load_employee(db, appointment.assigned_employee).await?;
    let event = CalendarEvent::for_appointment(appointment, employee.as_ref(), calendar.time_zone());

    match &appointment.google_calendar_event_id {
        Some(event_id) => {
            calendar.update_event(event_id, &event).await?;
            Ok(event_id.clone())
        },
        None => calendar.create_event(&event).await,
    }
}

async fn store_event_id(db: &DatabaseConnection, appointment: appointment::Model, event_id: String) -> Result<appointment::Model, ServiceError> {
    if appointment.google_calendar_event_id.as_deref() == Some(event_id.as_str()) {
        return Ok(appointment);
    }

    Appointment::update(appointment::ActiveModel {
        id: Unchanged(appointment.id),
        google_calendar_event_id: Set(Some(event_id)),
        ..Default::default()
    }).exec(db).await
        .map_err(|err| ServiceError::store("store calendar event id", err))
}

async fn set_status(db: &DatabaseConnection, calendar: Calendar, appointment: &appointment::Model, status: AppointmentStatus) -> Result<appointment::Model, ServiceError> {
    let appointment = Appointment::update(appointment::ActiveModel {
        id: Unchanged(appointment.id),
        appointment_status: Set(status),
        updated_at: Set(Local::now().fixed_offset()),
        ..Default::default()
    }).exec(db).await
        .map_err(|err| ServiceError::store("update appointment status", err))?;

    if let (Some(calendar), Some(_)) = (calendar, &appointment.google_calendar_event_id) {
        sync_event(db, calendar.get_ref(), &appointment).await?;
    }

    info!(appointment_id = %appointment.id, ?status, "appointment status changed");

    Ok(appointment)
}

#[get("")]
async fn get_appointments(db: web::Data<DatabaseConnection>, _session: Session, query: web::Query<AppointmentQuery>) -> Result<impl Responder, ServiceError> {
    let mut select = Appointment::find()
        .order_by_asc(appointment::Column::AppointmentDate)
        .order_by_asc(appointment::Column::AppointmentTime);

    if let Some(employee_id) = query.assigned_employee {
        select = select.filter(appointment::Column::AssignedEmployee.eq(employee_id));
    }

    let appointments = select
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load appointments", err))?;

    Ok(web::Json(appointments))
}

#[post("")]
async fn create_appointment(db: web::Data<DatabaseConnection>, calendar: Calendar, _session: Session, payload: web::Json<AppointmentForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;
    let now = Local::now().fixed_offset();

    let mut appointment = Appointment::insert(appointment::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(now),
        updated_at: Set(now),
        appointment_name: Set(form.appointment_name),
        appointment_date: Set(form.appointment_date),
        appointment_time: Set(form.appointment_time),
        assigned_employee: Set(form.assigned_employee),
        appointment_status: Set(AppointmentStatus::initial()),
        appointment_info: Set(form.appointment_info),
        google_calendar_event_id: Set(None),
    }).exec_with_returning(db.get_ref()).await
        .map_err(|err| ServiceError::store("insert appointment", err))?;

    if let Some(calendar) = calendar {
        let event_id = sync_event(db.get_ref(), calendar.get_ref(), &appointment).await?;
        appointment = store_event_id(db.get_ref(), appointment, event_id).await?;
    }

    Ok(HttpResponse::Created().json(web::Json(appointment)))
}

#[get("/{appointment_id}")]
async fn get_appointment(_session: Session, appointment: appointment::Model) -> impl Responder {
    web::Json(appointment)
}

#[put("/{appointment_id}")]
async fn update_appointment(db: web::Data<DatabaseConnection>, calendar: Calendar, _session: Session, appointment: appointment::Model, payload: web::Json<AppointmentForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let status = match form.appointment_status {
        Some(status) => appointment.appointment_status.edit(status)?,
        None => appointment.appointment_status,
    };

    let mut appointment = Appointment::update(appointment::ActiveModel {
        id: Unchanged(appointment.id),
        updated_at: Set(Local::now().fixed_offset()),
        appointment_name: Set(form.appointment_name),
        appointment_date: Set(form.appointment_date),
        appointment_time: Set(form.appointment_time),
        assigned_employee: Set(form.assigned_employee),
        appointment_status: Set(status),
        appointment_info: Set(form.appointment_info),
        ..Default::default()
    }).exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("update appointment", err))?;

    if let Some(calendar) = calendar {
        let event_id = sync_event(db.get_ref(), calendar.get_ref(), &appointment).await?;
        appointment = store_event_id(db.get_ref(), appointment, event_id).await?;
    }

    Ok(web::Json(appointment))
}

#[delete("/{appointment_id}")]
async fn delete_appointment(db: web::Data<DatabaseConnection>, calendar: Calendar, _session: Session, appointment: appointment::Model) -> Result<impl Responder, ServiceError> {
    if let (Some(calendar), Some(event_id)) = (calendar, &appointment.google_calendar_event_id) {
        calendar.delete_event(event_id).await?;
    }

    Appointment::delete_by_id(appointment.id)
        .exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("delete appointment", err))?;

    Ok(HttpResponse::NoContent().finish())
}

#[post("/{appointment_id}/complete")]
async fn complete_appointment(db: web::Data<DatabaseConnection>, calendar: Calendar, _session: Session, appointment: appointment::Model) -> Result<impl Responder, ServiceError> {
    let status = appointment.appointment_status.transition(AppointmentStatus::Completed)?;

    Ok(web::Json(set_status(db.get_ref(), calendar, &appointment, status).await?))
}

#[post("/{appointment_id}/cancel")]
async fn cancel_appointment(db: web::Data<DatabaseConnection>, calendar: Calendar, _session: Session, appointment: appointment::Model) -> Result<impl Responder, ServiceError> {
    let status = appointment.appointment_status.transition(AppointmentStatus::Cancelled)?;

    Ok(web::Json(set_status(db.get_ref(), calendar, &appointment, status).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::{Method, StatusCode}, test, App};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::{
        auth::{tests::{bearer, SECRET}, Authority, RoleType},
        calendar::tests::{appointment, RecordingCalendar},
        entity::sea_orm_active_enums::SalaryType,
        payroll::tests::employee,
    };

    use super::*;

    fn form(assigned_employee: Uuid, appointment_status: Option<AppointmentStatus>) -> AppointmentForm {
        AppointmentForm {
            appointment_name: "Contract review".to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            assigned_employee,
            appointment_info: None,
            appointment_status,
        }
    }

    #[actix_web::test]
    async fn test_create_syncs_calendar() {
        let alice = employee(SalaryType::Daily, dec!(500));
        let stored = appointment(alice.id);
        let synced = appointment::Model { google_calendar_event_id: Some("evt-1".to_string()), ..stored.clone() };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ stored.clone() ],
            ])
            .append_query_results([
                vec![ alice.clone() ],
            ])
            .append_query_results([
                vec![ synced.clone() ],
            ]);

        let recorder = Arc::new(RecordingCalendar::default());
        let calendar: Arc<dyn CalendarSync> = recorder.clone();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::from(calendar))
                .service(web::scope("/appointments").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri("/appointments")
            .method(Method::POST)
            .insert_header(bearer(RoleType::Staff))
            .set_json(form(alice.id, Some(AppointmentStatus::Completed)))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let returned: appointment::Model = test::read_body_json(response).await;
        assert_eq!(returned, synced);
        assert_eq!(*recorder.calls.lock().unwrap(), vec![ "create Contract review".to_string() ]);
    }

    #[actix_web::test]
    async fn test_create_without_calendar() {
        let stored = appointment(Uuid::new_v4());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ stored.clone() ],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/appointments").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri("/appointments")
            .method(Method::POST)
            .insert_header(bearer(RoleType::Staff))
            .set_json(form(stored.assigned_employee, None))
            .to_request();

        let returned: appointment::Model = test::call_and_read_body_json(&app, req).await;
        assert_eq!(returned.appointment_status, AppointmentStatus::Active);
        assert_eq!(returned.google_calendar_event_id, None);
    }

    #[actix_web::test]
    async fn test_complete_and_reject_reopen() {
        let active = appointment(Uuid::new_v4());
        let completed = appointment::Model { appointment_status: AppointmentStatus::Completed, ..active.clone() };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ active.clone() ],
                vec![ completed.clone() ],
                vec![ completed.clone() ],
            ]);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .service(web::scope("/appointments").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/appointments/{}/complete", active.id))
            .method(Method::POST)
            .insert_header(bearer(RoleType::Staff))
            .to_request();

        let returned: appointment::Model = test::call_and_read_body_json(&app, req).await;
        assert_eq!(returned.appointment_status, AppointmentStatus::Completed);

        let req = test::TestRequest::default()
            .uri(&format!("/appointments/{}/cancel", active.id))
            .method(Method::POST)
            .insert_header(bearer(RoleType::Staff))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_edit_cannot_close() {
        let confirmed = appointment::Model {
            appointment_status: AppointmentStatus::Confirmed,
            ..appointment(Uuid::new_v4())
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ confirmed.clone() ],
            ])
            .into_connection();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db))
                .service(web::scope("/appointments").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/appointments/{}", confirmed.id))
            .method(Method::PUT)
            .insert_header(bearer(RoleType::Staff))
            .set_json(form(confirmed.assigned_employee, Some(AppointmentStatus::Completed)))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_delete_removes_event() {
        let synced = appointment::Model {
            google_calendar_event_id: Some("evt-9".to_string()),
            ..appointment(Uuid::new_v4())
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ synced.clone() ],
            ])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);

        let recorder = Arc::new(RecordingCalendar::default());
        let calendar: Arc<dyn CalendarSync> = recorder.clone();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Authority::new(SECRET)))
                .app_data(web::Data::new(db.into_connection()))
                .app_data(web::Data::from(calendar))
                .service(web::scope("/appointments").configure(config))
        ).await;

        let req = test::TestRequest::default()
            .uri(&format!("/appointments/{}", synced.id))
            .method(Method::DELETE)
            .insert_header(bearer(RoleType::Staff))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(*recorder.calls.lock().unwrap(), vec![ "delete evt-9".to_string() ]);
    }
}
