use crate::config::PaginationConfig;
use crate::storage::{Product, ProductStore, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProductStore>,
    pub pagination: PaginationConfig,
}

/// Query string of the product listing.
///
/// `page` and `limit` stay raw so they can be validated here instead of
/// being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub code: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn skip(&self) -> Option<u64> {
        (self.page - 1).checked_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl ListProductsQuery {
    /// Parse `page` and `limit`, applying defaults and clamping `limit` to the configured maximum
    pub fn pagination(&self, config: &PaginationConfig) -> Result<Pagination, String> {
        let page = parse_positive("page", self.page.as_deref())?.unwrap_or(1);
        let limit = parse_positive("limit", self.limit.as_deref())?
            .unwrap_or(config.default_limit)
            .min(config.max_limit);
        Ok(Pagination { page, limit })
    }
}

fn parse_positive(field: &str, raw: Option<&str>) -> Result<Option<u64>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let invalid = || format!("{} must be a positive integer, got {:?}", field, raw);
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(value) => Ok(Some(value)),
    }
}

/// One page of matching products
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub data: Vec<Product>,
}

/// Readiness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound,
    /// Storage failure; `context` names the operation that failed
    Storage {
        context: &'static str,
        source: StoreError,
    },
}

impl AppError {
    pub fn storage(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Storage { context, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid query parameter".to_string(),
                    message: Some(msg),
                },
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Product not found".to_string(),
                    message: None,
                },
            ),
            AppError::Storage { context, source } => {
                error!(error = %source, "{}", context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: context.to_string(),
                        message: Some(source.to_string()),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
