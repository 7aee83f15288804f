use actix_web::{body, http::{header::ContentType, StatusCode}, HttpResponse};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::AppointmentStatus;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    /// Caller handed a calculation something it promised never to send
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a record with the same unique key already exists")]
    DuplicateRecord,

    #[error("attendance is already linked to a payroll and cannot be changed")]
    PaidRecordImmutable,

    #[error("no unpaid attendance records to process")]
    EmptyBatch,

    #[error("payroll {payroll_id} aggregated {expected} attendance records but only {linked} were linked")]
    PartialLinkFailure {
        payroll_id: Uuid,
        expected: usize,
        linked: u64,
    },

    #[error("record not found")]
    NotFound,

    #[error("appointment cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("{operation} failed: {source}")]
    ExternalService {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ServiceError {
    pub fn external(operation: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ExternalService {
            operation,
            source: Box::new(source),
        }
    }

    /// Store errors, with constraint violations surfaced as caller mistakes
    pub fn store(operation: &'static str, err: DbErr) -> Self {
        if let DbErr::RecordNotFound(_) = err {
            return Self::NotFound;
        }

        match err.sql_err().and_then(Self::constraint) {
            Some(constraint) => constraint,
            None => Self::external(operation, err),
        }
    }

    fn constraint(err: SqlErr) -> Option<Self> {
        match err {
            SqlErr::UniqueConstraintViolation(_) => Some(Self::DuplicateRecord),
            SqlErr::ForeignKeyConstraintViolation(_) => Some(Self::Validation("referenced record does not exist".to_string())),
            _ => None,
        }
    }
}

impl actix_web::error::ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::DuplicateRecord
            | ServiceError::PaidRecordImmutable
            | ServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ServiceError::EmptyBatch => StatusCode::OK,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::PartialLinkFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}
