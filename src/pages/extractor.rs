use std::str::FromStr;

use actix_web::{dev, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait, PrimaryKeyTrait};
use uuid::Uuid;

use crate::{
    entity::{appointment, attendance, employee, payroll, prelude::*, project, task},
    error::ServiceError,
};

/// Loads the record whose id sits in the `param` path segment
async fn find_by_path<E>(req: &HttpRequest, param: &'static str) -> Result<E::Model, actix_web::Error>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    let Some(id) = req.match_info().get(param) else {
        return Err(actix_web::error::ErrorInternalServerError(format!("this extractor must be used under `{param}` path")))
    };
    let Ok(id) = Uuid::from_str(id) else {
        return Err(actix_web::error::ErrorBadRequest(format!("invalid `{param}`")))
    };

    let Some(db) = req.app_data::<web::Data<DatabaseConnection>>() else {
        return Err(actix_web::error::ErrorInternalServerError("database is not configured"))
    };

    let Some(model) = E::find_by_id(id)
        .one(db.get_ref()).await
        .map_err(|err| ServiceError::store("load record", err))?
    else {
        return Err(ServiceError::NotFound.into())
    };

    Ok(model)
}

macro_rules! path_record {
    ($model:ty, $entity:ty, $param:literal) => {
        impl FromRequest for $model {
            type Error = actix_web::Error;
            type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
                let req = req.clone();

                Box::pin(async move {
                    find_by_path::<$entity>(&req, $param).await
                })
            }
        }
    };
}

path_record!(employee::Model, Employee, "employee_id");
path_record!(attendance::Model, Attendance, "attendance_id");
path_record!(payroll::Model, Payroll, "payroll_id");
path_record!(project::Model, Project, "project_id");
path_record!(task::Model, Task, "task_id");
path_record!(appointment::Model, Appointment, "appointment_id");
