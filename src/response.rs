/// Uniform Response Envelope
///
/// Every response body, success or failure, has the shape
/// `{status, success, message, data}`.

use actix_web::http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            success: status.as_u16() < 400,
            message: message.into(),
            data,
        }
    }
}

impl ApiResponse<Option<()>> {
    /// Envelope for an error: `data` is always `null`.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, None, message)
    }
}

/// Empty JSON object for endpoints with nothing to return
#[derive(Debug, Serialize)]
pub struct Empty {}
