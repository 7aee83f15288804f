use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use sea_orm::{ActiveValue::{Set, Unchanged}, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::Session,
    entity::{prelude::*, task},
    error::ServiceError,
};

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(get_tasks)
        .service(create_task)
        .service(get_task)
        .service(update_task)
        .service(delete_task)
        .service(toggle_task);
}

/// Open task whose deadline has passed
pub(super) fn is_overdue(task: &task::Model, today: NaiveDate) -> bool {
    !task.is_completed && task.task_deadline < today
}

/// Flips completion, stamping `completed_at` on the way in and clearing it on the way out
fn toggle_complete(task: &task::Model, now: DateTime<FixedOffset>) -> task::ActiveModel {
    let is_completed = !task.is_completed;

    task::ActiveModel {
        id: Unchanged(task.id),
        is_completed: Set(is_completed),
        completed_at: Set(is_completed.then_some(now)),
        ..Default::default()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskForm {
    project_id: Option<Uuid>,
    assigned_to: Uuid,
    task_name: String,
    #[serde(default)]
    task_details: String,
    task_deadline: NaiveDate,
    attachment_url: Option<String>,
    attachment_name: Option<String>,
    attachment_size: Option<i64>,
    attachment_type: Option<String>,
}

impl TaskForm {
    fn validate(self) -> Result<Self, ServiceError> {
        if self.task_name.trim().is_empty() {
            return Err(ServiceError::Validation("task name is required".to_string()));
        }
        if self.attachment_size.is_some_and(|size| size < 0) {
            return Err(ServiceError::Validation("attachment size must not be negative".to_string()));
        }

        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskQuery {
    assigned_to: Option<Uuid>,
    project_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskView {
    #[serde(flatten)]
    task: task::Model,
    is_overdue: bool,
}

#[get("")]
async fn get_tasks(db: web::Data<DatabaseConnection>, _session: Session, query: web::Query<TaskQuery>) -> Result<impl Responder, ServiceError> {
    let mut select = Task::find().order_by_asc(task::Column::TaskDeadline);

    if let Some(assigned_to) = query.assigned_to {
        select = select.filter(task::Column::AssignedTo.eq(assigned_to));
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(task::Column::ProjectId.eq(project_id));
    }

    let today = Local::now().date_naive();
    let tasks = select
        .all(db.get_ref()).await
        .map_err(|err| ServiceError::store("load tasks", err))?
        .into_iter()
        .map(|task| TaskView { is_overdue: is_overdue(&task, today), task })
        .collect::<Vec<_>>();

    Ok(web::Json(tasks))
}

#[post("")]
async fn create_task(db: web::Data<DatabaseConnection>, _session: Session, payload: web::Json<TaskForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let task = Task::insert(task::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(form.project_id),
        assigned_to: Set(form.assigned_to),
        task_name: Set(form.task_name),
        task_details: Set(form.task_details),
        task_created: Set(Local::now().fixed_offset()),
        task_deadline: Set(form.task_deadline),
        is_completed: Set(false),
        completed_at: Set(None),
        attachment_url: Set(form.attachment_url),
        attachment_name: Set(form.attachment_name),
        attachment_size: Set(form.attachment_size),
        attachment_type: Set(form.attachment_type),
    }).exec_with_returning(db.get_ref()).await
        .map_err(|err| ServiceError::store("insert task", err))?;

    Ok(HttpResponse::Created().json(web::Json(task)))
}

#[get("/{task_id}")]
async fn get_task(_session: Session, task: task::Model) -> impl Responder {
    web::Json(task)
}

#[put("/{task_id}")]
async fn update_task(db: web::Data<DatabaseConnection>, _session: Session, task: task::Model, payload: web::Json<TaskForm>) -> Result<impl Responder, ServiceError> {
    let form = payload.into_inner().validate()?;

    let task = Task::update(task::ActiveModel {
        id: Unchanged(task.id),
        project_id: Set(form.project_id),
        assigned_to: Set(form.assigned_to),
        task_name: Set(form.task_name),
        task_details: Set(form.task_details),
        task_deadline: Set(form.task_deadline),
        attachment_url: Set(form.attachment_url),
        attachment_name: Set(form.attachment_name),
        attachment_size: Set(form.attachment_size),
        attachment_type: Set(form.attachment_type),
        ..Default::default()
    }).exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("update task", err))?;

    Ok(web::Json(task))
}

#[delete("/{task_id}")]
async fn delete_task(db: web::Data<DatabaseConnection>, _session: Session, task: task::Model) -> Result<impl Responder, ServiceError> {
    Task::delete_by_id(task.id)
        .exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("delete task", err))?;

    Ok(HttpResponse::NoContent().finish())
}

#[post("/{task_id}/toggle")]
async fn toggle_task(db: web::Data<DatabaseConnection>, _session: Session, task: task::Model) -> Result<impl Responder, ServiceError> {
    let task = Task::update(toggle_complete(&task, Local::now().fixed_offset()))
        .exec(db.get_ref()).await
        .map_err(|err| ServiceError::store("toggle task", err))?;

    debug!(task_id = %task.id, is_completed = task.is_completed, "task toggled");

    Ok(web::Json(task))
}
