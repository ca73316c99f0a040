use std::io::ErrorKind;

use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header},
};
use thiserror::Error;

use crate::views;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found")]
    NotFound,
    #[error("path is outside the media root")]
    Forbidden,
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0}")]
    BadRequest(String),
    #[error("range not satisfiable")]
    RangeNotSatisfiable(u64),
}

impl AppError {
    pub fn from_fs(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::NotADirectory => AppError::NotFound,
            ErrorKind::PermissionDenied => AppError::PermissionDenied,
            _ => AppError::Io(err),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden | AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::NotFound => html_error(status, "Not found"),
            AppError::Forbidden | AppError::PermissionDenied => html_error(status, "Access denied"),
            AppError::RangeNotSatisfiable(total) => HttpResponse::build(status)
                .insert_header((header::CONTENT_RANGE, format!("bytes */{total}")))
                .insert_header((header::ACCEPT_RANGES, "bytes"))
                .finish(),
            _ => HttpResponse::build(status).json(serde_json::json!({
                "error": self.to_string()
            })),
        }
    }
}

fn html_error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(views::error_page(status.as_u16(), message).into_string())
}
