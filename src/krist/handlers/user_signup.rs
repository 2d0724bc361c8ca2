use crate::krist::auth::Verifier;
use crate::krist::error::ApiError;
use crate::krist::handlers::{
    generate_salt, hash_password, normalize_email, valid_email, AuthResponse, UserResponse,
    MIN_PASSWORD_LENGTH,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupPayload {
    name: String,
    email: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/api/user/signup",
    request_body = SignupPayload,
    responses (
        (status = 201, description = "Account created, token issued", body = AuthResponse, content_type = "application/json"),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already in use"),
    ),
    tag = "user",
)]
#[instrument(skip(pool, verifier, payload))]
pub async fn signup(
    Extension(pool): Extension<PgPool>,
    Extension(verifier): Extension<Verifier>,
    payload: Option<Json<SignupPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    let email = normalize_email(&payload.email);
    if !valid_email(&email) {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid email"));
    }

    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }

    let salt = generate_salt().map_err(|err| {
        error!("Failed to generate salt: {err}");
        ApiError::internal()
    })?;
    let password_hash = hash_password(&salt, &payload.password);

    let user_id = Uuid::now_v7();
    let row = sqlx::query(
        "INSERT INTO users (id, name, email, password_salt, password_hash) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (email) DO NOTHING \
         RETURNING id",
    )
    .bind(user_id)
    .bind(&payload.name)
    .bind(&email)
    .bind(salt.as_slice())
    .bind(&password_hash)
    .fetch_optional(&pool)
    .await?;

    if row.is_none() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "Email is already in use",
        ));
    }

    debug!("Created user {user_id}");

    let token = verifier.issue(user_id).map_err(|err| {
        error!("Failed to issue token: {err}");
        ApiError::internal()
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse {
                id: user_id,
                name: payload.name,
                email,
            },
        }),
    ))
}
