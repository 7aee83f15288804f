use std::collections::HashMap;

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{Admin, Session},
    entity::{employee, prelude::*},
    error::ServiceError,
    payroll::{self, PayrollGenerator, PayrollTotals, PayrollView},
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(generate_payroll)
        .service(get_summaries)
        .service(get_employee_payroll)
        .service(update_payroll)
        .service(delete_payroll);
}

#[derive(Debug, Serialize, Deserialize)]
struct NothingToProcess {
    status: String,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Unlinked {
    unlinked: u64,
}

#[post("/generate")]
async fn generate_payroll(db: web::Data<DatabaseConnection>, generator: web::Data<PayrollGenerator>, admin: Admin) -> Result<impl Responder, ServiceError> {
    let payrolls = match generator.generate(db.get_ref()).await {
        Ok(payrolls) => payrolls,
        Err(err @ ServiceError::EmptyBatch) => {
            return Ok(HttpResponse::Ok().json(web::Json(NothingToProcess {
                status: "nothing_to_process".to_string(),
                message: err.to_string(),
            })));
        },
        Err(err) => return Err(err),
    };

    info!(admin = %admin.username, count = payrolls.len(), "payroll generation requested");

    let employees = Employee::find()
        .filter(employee::Column::Id.is_in(payrolls.iter().map(|payroll| payroll.employee_id)))
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load employees", err))?
        .into_iter()
        .map(|employee| (employee.id, employee))
        .collect::<HashMap<_, _>>();

    let views = payrolls.into_iter()
        .map(|payroll| {
            let employee = employees.get(&payroll.employee_id).ok_or(ServiceError::NotFound)?;
            PayrollView::new(payroll, employee)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HttpResponse::Created().json(web::Json(views)))
}

#[get("")]
async fn get_summaries(db: web::Data<DatabaseConnection>, _session: Session) -> Result<impl Responder, ServiceError> {
    Ok(web::Json(payroll::summaries(db.get_ref()).await?))
}

#[get("/employee/{employee_id}")]
async fn get_employee_payroll(db: web::Data<DatabaseConnection>, _session: Session, employee: employee::Model) -> Result<impl Responder, ServiceError> {
    Ok(web::Json(payroll::for_employee(db.get_ref(), &employee).await?))
}

#[put("/{payroll_id}")]
async fn update_payroll(db: web::Data<DatabaseConnection>, _admin: Admin, payroll_id: web::Path<Uuid>, payload: web::Json<PayrollTotals>) -> Result<impl Responder, ServiceError> {
    let payroll = payroll::update(db.get_ref(), payroll_id.into_inner(), payload.into_inner()).await?;

    Ok(web::Json(payroll))
}

#[delete("/{payroll_id}")]
async fn delete_payroll(db: web::Data<DatabaseConnection>, _admin: Admin, payroll_id: web::Path<Uuid>) -> Result<impl Responder, ServiceError> {
    let unlinked = payroll::delete(db.get_ref(), payroll_id.into_inner()).await?;

    Ok(web::Json(Unlinked { unlinked }))
}
