use actix_web::{http::StatusCode, HttpResponse};

use crate::response::{ApiResponse, Empty};

/// GET /health_check
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(ApiResponse::new(StatusCode::OK, Empty {}, "OK"))
}
