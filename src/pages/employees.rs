use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{Admin, Session},
    entity::{employee, prelude::*, sea_orm_active_enums::{EmploymentStatus, SalaryType}},
    error::ServiceError,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_employees)
        .service(create_employee)
        .service(get_employee)
        .service(update_employee)
        .service(delete_employee);
}

#[derive(Debug, Serialize, Deserialize)]
struct EmployeeForm {
    name: String,
    address: String,
    contact_number: String,
    email: String,
    date_hired: NaiveDate,
    employment_status: EmploymentStatus,
    salary_rate: Decimal,
    salary_type: SalaryType,
}

impl EmployeeForm {
    fn validate(self) -> Result<Self, ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(ServiceError::Validation("email is required".to_string()));
        }
        if self.salary_rate <= Decimal::ZERO {
            return Err(ServiceError::Validation("salary rate must be greater than 0".to_string()));
        }

        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EmployeeQuery {
    status: Option<EmploymentStatus>,
}

#[get("")]
async fn get_employees(db: web::Data<DatabaseConnection>, _session: Session, query: web::Query<EmployeeQuery>) -> Result<impl Responder, ServiceError> {
    let mut select = Employee::find().order_by_asc(employee::Column::Name);

    if let Some(status) = query.status {
        select = select.filter(employee::Column::EmploymentStatus.eq(status));
    }

    let employees = select
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load employees", err))?;

    Ok(web::Json(employees))
}

#[post("")]
async fn create_employee(db: web::Data<DatabaseConnection>, _admin: Admin, payload: web::Json<EmployeeForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let employee = Employee::insert(employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_at: Set(Local::now().fixed_offset()),
        name: Set(form.name),
        address: Set(form.address),
        contact_number: Set(form.contact_number),
        email: Set(form.email),
        date_hired: Set(form.date_hired),
        employment_status: Set(form.employment_status),
        salary_rate: Set(form.salary_rate),
        salary_type: Set(form.salary_type),
    }).exec_with_returning(db.get_ref()).await
        .map_err(|err| ServiceError::store("insert employee", err))?;

    info!(employee_id = %employee.id, "employee created");

    Ok(HttpResponse::Created().json(web::Json(employee)))
}

#[get("/{employee_id}")]
async fn get_employee(_session: Session, employee: employee::Model) -> impl Responder {
    web::Json(employee)
}

#[put("/{employee_id}")]
async fn update_employee(db: web::Data<DatabaseConnection>, _admin: Admin, employee: employee::Model, payload: web::Json<EmployeeForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let employee = Employee::update(employee::ActiveModel {
        id: Unchanged(employee.id),
        name: Set(form.name),
        address: Set(form.address),
        contact_number: Set(form.contact_number),
        email: Set(form.email),
        date_hired: Set(form.date_hired),
        employment_status: Set(form.employment_status),
        salary_rate: Set(form.salary_rate),
        salary_type: Set(form.salary_type),
        ..Default::default()
    }).exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("update employee", err))?;

    Ok(web::Json(employee))
}

/// Attendance, payroll, tasks and appointments go with the employee through FK cascades
#[delete("/{employee_id}")]
async fn delete_employee(db: web::Data<DatabaseConnection>, _admin: Admin, employee: employee::Model) -> Result<impl Responder, ServiceError> {
    Employee::delete_by_id(employee.id)
        .exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("delete employee", err))?;

    info!(employee_id = %employee.id, "employee deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::{http::{Method, StatusCode}, test, App};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::{auth::{tests::{bearer, SECRET}, Authority, RoleType}, payroll::tests::employee};

    use super::*;

    macro_rules! app {
        ($db:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Authority::new(SECRET)))
                    .app_data(web::Data::new($db.into_connection()))
                    .service(web::scope("/employees").configure(config))
            ).await
        };
    }

    fn form(salary_rate: Decimal) -> EmployeeForm {
        EmployeeForm {
            name: "Alice".to_string(),
            address: "1 Main St".to_string(),
            contact_number: "555-0100".to_string(),
            email: "alice@example.com".to_string(),
            date_hired: NaiveDate::from_ymd_opt(2023, 1, 9).unwrap(),
            employment_status: EmploymentStatus::Active,
            salary_rate,
            salary_type: SalaryType::Daily,
        }
    }

    #[actix_web::test]
    async fn test_create_employee() {
        let alice = employee(SalaryType::Daily, dec!(500));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ alice.clone() ],
            ]);

        let app = app!(db);

        let req = test::TestRequest::default()
            .uri("/employees")
            .method(Method::POST)
            .insert_header(bearer(RoleType::Admin))
            .set_json(form(dec!(500)))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let returned: employee::Model = test::read_body_json(response).await;
        assert_eq!(returned, alice);
    }

    #[actix_web::test]
    async fn test_create_employee_requires_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);
        let app = app!(db);

        let req = test::TestRequest::default()
            .uri("/employees")
            .method(Method::POST)
            .insert_header(bearer(RoleType::Staff))
            .set_json(form(dec!(500)))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_create_employee_rejects_zero_rate() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);
        let app = app!(db);

        let req = test::TestRequest::default()
            .uri("/employees")
            .method(Method::POST)
            .insert_header(bearer(RoleType::Admin))
            .set_json(form(dec!(0)))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_get_employees_by_status() {
        let mut on_leave = employee(SalaryType::Monthly, dec!(16000));
        on_leave.employment_status = EmploymentStatus::OnLeave;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ on_leave.clone() ],
            ]);

        let app = app!(db);

        let req = test::TestRequest::default()
            .uri("/employees?status=On%20Leave")
            .insert_header(bearer(RoleType::Staff))
            .to_request();

        let employees: Vec<employee::Model> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(employees, vec![ on_leave ]);
    }

    #[actix_web::test]
    async fn test_delete_employee() {
        let alice = employee(SalaryType::Daily, dec!(500));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![ alice.clone() ],
            ])
            .append_exec_results([
                MockExecResult { last_insert_id: 0, rows_affected: 1 },
            ]);

        let app = app!(db);

        let req = test::TestRequest::default()
            .uri(&format!("/employees/{}", alice.id))
            .method(Method::DELETE)
            .insert_header(bearer(RoleType::Admin))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
