use std::{error::Error, fmt::Display};

use axum::{http::StatusCode, response::IntoResponse, Json};
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::CatalogClient, db::Db, providers::composite::CompositeProvider, queue::RequestQueue,
    scanner::FsScanner, server::JwtValidator,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: &'static Db,
    pub catalog: &'static CatalogClient,
    pub providers: &'static CompositeProvider,
    pub queue: &'static RequestQueue,
    pub scanner: &'static FsScanner,
    pub jwt: &'static JwtValidator,
    pub cancellation_token: CancellationToken,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AppError {
    pub message: String,
    #[serde(skip)]
    pub kind: AppErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppErrorKind {
    InternalError,
    NotFound,
    BadRequest,
    Forbidden,
}

impl Error for AppError {}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            AppErrorKind::InternalError => write!(f, "Internal Error: {}", self.message),
            AppErrorKind::NotFound => write!(f, "Not Found Error: {}", self.message),
            AppErrorKind::BadRequest => write!(f, "Bad Request: {}", self.message),
            AppErrorKind::Forbidden => write!(f, "Forbidden: {}", self.message),
        }
    }
}

impl From<AppErrorKind> for StatusCode {
    fn from(val: AppErrorKind) -> Self {
        match val {
            AppErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            AppErrorKind::NotFound => StatusCode::NOT_FOUND,
            AppErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            AppErrorKind::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            kind: AppErrorKind::InternalError,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => AppError {
                message: "Database row not found".to_string(),
                kind: AppErrorKind::NotFound,
            },
            rest => AppError {
                message: format!("{}", rest),
                kind: AppErrorKind::InternalError,
            },
        }
    }
}

impl AppError {
    pub fn new(message: impl AsRef<str>, kind: AppErrorKind) -> Self {
        Self {
            message: message.as_ref().into(),
            kind,
        }
    }

    pub fn not_found(msg: impl AsRef<str>) -> AppError {
        Self::new(msg, AppErrorKind::NotFound)
    }

    pub fn bad_request(msg: impl AsRef<str>) -> AppError {
        Self::new(msg, AppErrorKind::BadRequest)
    }

    pub fn forbidden(msg: impl AsRef<str>) -> AppError {
        Self::new(msg, AppErrorKind::Forbidden)
    }

    pub fn internal_error(msg: impl AsRef<str>) -> AppError {
        Self::new(msg, AppErrorKind::InternalError)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status: StatusCode = self.kind.clone().into();
        (status, Json(self)).into_response()
    }
}
