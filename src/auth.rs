use std::{fmt::Debug, ops::Deref};

use actix_web::{body, dev, http::{self, header::ContentType, StatusCode}, web, FromRequest, HttpRequest, HttpResponse};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Verifies tokens issued by the identity provider
///
/// Sessions are signed with the shared `JWT_SECRET`; issuing them is not our job
pub struct Authority {
    decoding_key: DecodingKey,
    #[cfg(test)]
    encoding_key: jsonwebtoken::EncodingKey,
}

impl Authority {
    pub fn new(jwt_key: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_key),
            #[cfg(test)]
            encoding_key: jsonwebtoken::EncodingKey::from_secret(jwt_key),
        }
    }

    /// Issue a token for the session with 1 week of expiration time
    #[cfg(test)]
    pub fn issue_for(&self, session: &Session) -> String {
        let claims = Claims {
            exp: (chrono::Local::now() + chrono::Duration::weeks(1)).timestamp(),
            data: session,
        };

        jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &self.encoding_key).unwrap()
    }

    pub fn authorize(&self, token: impl AsRef<str>) -> Result<Session, AuthError> {
        let payload = decode::<Claims<Session>>(token.as_ref(), &self.decoding_key, &Validation::default())?;

        Ok(payload.claims.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Staff,
    Admin,
}

/// Identity carried inside the bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub username: String,
    pub role: RoleType,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims<T> {
    exp: i64,
    data: T,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session token rejected")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("session verification is not configured")]
    NotConfigured,
}

impl actix_web::error::ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse<body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> http::StatusCode {
        match self {
            AuthError::InvalidToken(_) => StatusCode::FORBIDDEN,
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // Takes the value after the scheme of the `Authorization` header
            // Example: Bearer sometoken
            //                 ^ grabs this value
            let Some(Ok(Some((_, token)))) = req.headers()
                .get("Authorization")
                .map(|v|
                    v.to_str()
                        .map(|str| str.split_once(" "))
                )
            else {
                return Err(actix_web::error::ErrorUnauthorized("unauthorized"))
            };

            let authority = req.app_data::<web::Data<Authority>>().ok_or(AuthError::NotConfigured)?;
            let session = authority.authorize(token.trim())?;

            Ok(session)
        })
    }
}

/// HR administrator, the only role allowed to run payroll and manage employees
pub struct Admin(pub Session);

impl Deref for Admin {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Admin {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let session = Session::from_request(&req, &mut dev::Payload::None).await?;

            if session.role != RoleType::Admin {
                return Err(actix_web::error::ErrorForbidden("forbidden"))
            }

            Ok(Self(session))
        })
    }
}
