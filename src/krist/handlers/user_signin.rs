use crate::krist::auth::Verifier;
use crate::krist::error::ApiError;
use crate::krist::handlers::{hash_password, normalize_email, AuthResponse, UserResponse};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SigninPayload {
    email: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/api/user/signin",
    request_body = SigninPayload,
    responses (
        (status = 200, description = "Signed in, token issued", body = AuthResponse, content_type = "application/json"),
        (status = 403, description = "Incorrect password"),
        (status = 404, description = "User not found"),
    ),
    tag = "user",
)]
#[instrument(skip(pool, verifier, payload))]
pub async fn signin(
    Extension(pool): Extension<PgPool>,
    Extension(verifier): Extension<Verifier>,
    payload: Option<Json<SigninPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    let email = normalize_email(&payload.email);

    let row = sqlx::query(
        "SELECT id, name, email, password_salt, password_hash FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await?;

    let Some(row) = row else {
        return Err(ApiError::not_found("User not found"));
    };

    let salt: Vec<u8> = row.get("password_salt");
    let stored_hash: Vec<u8> = row.get("password_hash");
    if hash_password(&salt, &payload.password) != stored_hash {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Incorrect password"));
    }

    let user_id: Uuid = row.get("id");

    debug!("User {user_id} signed in");

    let token = verifier.issue(user_id).map_err(|err| {
        error!("Failed to issue token: {err}");
        ApiError::internal()
    })?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            token,
            user: UserResponse {
                id: user_id,
                name: row.get("name"),
                email: row.get("email"),
            },
        }),
    ))
}
