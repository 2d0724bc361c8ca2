use crate::krist::auth::Identity;
use crate::krist::error::ApiError;
use crate::krist::handlers::products::Product;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Payload for adding or removing a favorite product.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FavoriteUpdate {
    pub id: Uuid,
}

#[utoipa::path(
    get,
    path = "/api/user/favorite",
    responses (
        (status = 200, description = "The user's favorite products", body = [Product], content_type = "application/json"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "favorite",
)]
#[instrument(skip(pool))]
pub async fn get_favorites(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT p.id, p.title, p.description, p.image_url, p.category, p.price_cents \
         FROM favorites f JOIN products p ON p.id = f.product_id \
         WHERE f.user_id = $1 \
         ORDER BY p.title",
    )
    .bind(identity.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(products))
}

#[utoipa::path(
    post,
    path = "/api/user/favorite",
    request_body = FavoriteUpdate,
    responses (
        (status = 200, description = "Product added to favorites"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Product not found"),
    ),
    tag = "favorite",
)]
#[instrument(skip(pool))]
pub async fn add_favorite(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    payload: Option<Json<FavoriteUpdate>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    let exists: bool =
        sqlx::query("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1) AS found")
            .bind(payload.id)
            .fetch_one(&pool)
            .await?
            .get("found");

    if !exists {
        return Err(ApiError::not_found("Product not found"));
    }

    // Re-adding a favorite is a no-op
    sqlx::query(
        "INSERT INTO favorites (user_id, product_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(identity.user_id)
    .bind(payload.id)
    .execute(&pool)
    .await?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    patch,
    path = "/api/user/favorite",
    request_body = FavoriteUpdate,
    responses (
        (status = 200, description = "Product removed from favorites"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "favorite",
)]
#[instrument(skip(pool))]
pub async fn remove_favorite(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    payload: Option<Json<FavoriteUpdate>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
        .bind(identity.user_id)
        .bind(payload.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::OK)
}
