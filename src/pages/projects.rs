use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Local;
use sea_orm::{ActiveValue::{Set, Unchanged}, DatabaseConnection, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Session,
    entity::{prelude::*, project},
    error::ServiceError,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_projects)
        .service(create_project)
        .service(get_project)
        .service(update_project)
        .service(delete_project);
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectForm {
    project_name: String,
    client_name: String,
    #[serde(default)]
    project_details: String,
}

impl ProjectForm {
    fn validate(self) -> Result<Self, ServiceError> {
        if self.project_name.trim().is_empty() || self.client_name.trim().is_empty() {
            return Err(ServiceError::Validation("project and client name are required".to_string()));
        }

        Ok(self)
    }
}

#[get("")]
async fn get_projects(db: web::Data<DatabaseConnection>, _session: Session) -> Result<impl Responder, ServiceError> {
    let projects = Project::find()
        .order_by_desc(project::Column::ProjectCreated)
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load projects", err))?;

    Ok(web::Json(projects))
}

#[post("")]
async fn create_project(db: web::Data<DatabaseConnection>, _session: Session, payload: web::Json<ProjectForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let project = Project::insert(project::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_name: Set(form.project_name),
        client_name: Set(form.client_name),
        project_details: Set(form.project_details),
        project_created: Set(Local::now().fixed_offset()),
    }).exec_with_returning(db.get_ref()).await
        .map_err(|err| ServiceError::store("insert project", err))?;

    Ok(HttpResponse::Created().json(web::Json(project)))
}

#[get("/{project_id}")]
async fn get_project(_session: Session, project: project::Model) -> impl Responder {
    web::Json(project)
}

#[put("/{project_id}")]
async fn update_project(db: web::Data<DatabaseConnection>, _session: Session, project: project::Model, payload: web::Json<ProjectForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let project = Project::update(project::ActiveModel {
        id: Unchanged(project.id),
        project_name: Set(form.project_name),
        client_name: Set(form.client_name),
        project_details: Set(form.project_details),
        ..Default::default()
    }).exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("update project", err))?;

    Ok(web::Json(project))
}

/// Tasks of the project stay, detached from it
#[delete("/{project_id}")]
async fn delete_project(db: web::Data<DatabaseConnection>, _session: Session, project: project::Model) -> Result<impl Responder, ServiceError> {
    Project::delete_by_id(project.id)
        .exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("delete project", err))?;

    Ok(HttpResponse::NoContent().finish())
}
