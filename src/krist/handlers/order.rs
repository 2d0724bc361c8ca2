use crate::krist::auth::Identity;
use crate::krist::error::ApiError;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OrderLine {
    pub id: Uuid,
    pub quantity: i32,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OrderPayload {
    pub products: Vec<OrderLine>,
    pub address: String,
    pub total_cents: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub address: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/user/order",
    request_body = OrderPayload,
    responses (
        (status = 201, description = "Order placed", body = Order, content_type = "application/json"),
        (status = 400, description = "Empty order"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "order",
)]
#[instrument(skip(pool, payload))]
pub async fn place_order(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    payload: Option<Json<OrderPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    if payload.products.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Order has no products"));
    }

    let order_id = Uuid::now_v7();
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, user_id, address, total_cents) VALUES ($1, $2, $3, $4) \
         RETURNING id, address, total_cents, created_at",
    )
    .bind(order_id)
    .bind(identity.user_id)
    .bind(&payload.address)
    .bind(payload.total_cents)
    .fetch_one(&mut *tx)
    .await?;

    for line in merge_order_lines(&payload.products) {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(order_id)
        .bind(line.id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
    }

    // An order consumes the cart
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(identity.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    debug!("Placed order {order_id}");

    Ok((StatusCode::CREATED, Json(order)))
}

// Collapse repeated products into one line each; order_items is keyed by
// (order_id, product_id) so duplicate inserts would abort the transaction.
fn merge_order_lines(lines: &[OrderLine]) -> Vec<OrderLine> {
    let mut merged: Vec<OrderLine> = Vec::new();

    for line in lines {
        let quantity = line.quantity.max(1);
        match merged.iter_mut().find(|m| m.id == line.id) {
            Some(existing) => existing.quantity += quantity,
            None => merged.push(OrderLine {
                id: line.id,
                quantity,
            }),
        }
    }

    merged
}

#[utoipa::path(
    get,
    path = "/api/user/order",
    responses (
        (status = 200, description = "The user's orders, most recent first", body = [Order], content_type = "application/json"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "order",
)]
#[instrument(skip(pool))]
pub async fn get_orders(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT id, address, total_cents, created_at FROM orders \
         WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(identity.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(orders))
}
