use crate::api::models::AppState;
use crate::api::products::handlers::{get_product_handler, list_products_handler};
use axum::{routing::get, Router};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products_handler))
        .route("/api/products/{code}", get(get_product_handler))
}
