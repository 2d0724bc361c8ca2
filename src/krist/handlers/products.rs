use crate::krist::error::ApiError;
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// A storefront product. Prices are integer cents to avoid floating-point
/// rounding on the wire.
#[derive(ToSchema, Serialize, Deserialize, Debug, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub price_cents: i64,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
pub struct ProductFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive substring match against the title
    pub search: Option<String>,
    /// Inclusive lower price bound, in cents
    pub min_price: Option<i64>,
    /// Inclusive upper price bound, in cents
    pub max_price: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductFilter),
    responses (
        (status = 200, description = "Products matching the filter", body = [Product], content_type = "application/json"),
    ),
    tag = "products",
)]
#[instrument(skip(pool))]
pub async fn products(
    Extension(pool): Extension<PgPool>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, title, description, image_url, category, price_cents FROM products \
         WHERE ($1::text IS NULL OR category = $1) \
           AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%') \
           AND ($3::bigint IS NULL OR price_cents >= $3) \
           AND ($4::bigint IS NULL OR price_cents <= $4) \
         ORDER BY title",
    )
    .bind(&filter.category)
    .bind(&filter.search)
    .bind(filter.min_price)
    .bind(filter.max_price)
    .fetch_all(&pool)
    .await?;

    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    responses (
        (status = 200, description = "Product details", body = Product, content_type = "application/json"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products",
)]
#[instrument(skip(pool))]
pub async fn product_details(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, title, description, image_url, category, price_cents FROM products \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    product
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product not found"))
}
