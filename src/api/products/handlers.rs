use crate::api::models::*;
use crate::storage::{PageWindow, Product, ProductFilter};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use tracing::info;

pub async fn list_products_handler(
    State(state): State<AppState>,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> Result<Json<ProductPage>, AppError> {
    // Validate
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let pagination = query
        .pagination(&state.pagination)
        .map_err(AppError::BadRequest)?;
    let skip = pagination
        .skip()
        .ok_or_else(|| AppError::BadRequest("page is out of range".to_string()))?;

    let filter = ProductFilter::new(query.code, query.name, query.brand);

    info!(
        code = ?filter.code,
        name = ?filter.name,
        brand = ?filter.brand,
        page = pagination.page,
        limit = pagination.limit,
        "Listing products"
    );

    // Count, then fetch the window. The two reads are not atomic.
    let total = state
        .store
        .count(&filter)
        .await
        .map_err(AppError::storage("Error fetching products"))?;

    let data = state
        .store
        .find(
            &filter,
            PageWindow {
                skip,
                limit: pagination.limit,
            },
        )
        .await
        .map_err(AppError::storage("Error fetching products"))?;

    info!(total, returned = data.len(), "Products listed");

    Ok(Json(ProductPage {
        total,
        page: pagination.page,
        limit: pagination.limit,
        total_pages: pagination.total_pages(total),
        data,
    }))
}

pub async fn get_product_handler(
    State(state): State<AppState>,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<Product>, AppError> {
    let Path(code) = code.map_err(|e| AppError::BadRequest(e.body_text()))?;
    info!(code = %code, "Fetching product");

    let product = state
        .store
        .find_by_code(&code)
        .await
        .map_err(AppError::storage("Error fetching product"))?
        .ok_or(AppError::NotFound)?;

    Ok(Json(product))
}
