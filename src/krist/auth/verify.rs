use crate::krist::auth::{jwt, TOKEN_EXPIRATION};
use crate::krist::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use uuid::Uuid;

/// Identity decoded from a verified token, inserted into the request
/// extensions for the duration of one request. Downstream handlers trust it
/// without re-checking the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

/// Stateless token signer/verifier around the server-held secret. Holds no
/// per-request state; one instance is shared by every route.
#[derive(Clone)]
pub struct Verifier {
    secret: SecretString,
}

impl Verifier {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Issue a session token for `user_id` with the standard expiration.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or signed.
    pub fn issue(&self, user_id: Uuid) -> Result<String, jwt::Error> {
        let now = Utc::now().timestamp();
        let claims = jwt::Claims {
            id: user_id.to_string(),
            iat: now,
            exp: Some(now + TOKEN_EXPIRATION),
        };

        jwt::sign_hs256(self.secret.expose_secret().as_bytes(), &claims)
    }

    /// Check the `Authorization` header and return the embedded identity.
    ///
    /// Every non-valid state (missing header, malformed header, bad
    /// signature, expired token) collapses into the same 401 rejection; the
    /// underlying cause is logged, not leaked to the caller.
    ///
    /// # Errors
    /// Returns [`ApiError::unauthenticated`] for any invalid token.
    pub fn verify(&self, headers: &HeaderMap) -> Result<Identity, ApiError> {
        let Some(authorization) = headers.get(AUTHORIZATION) else {
            debug!("Missing authorization header");
            return Err(ApiError::unauthenticated());
        };

        let authorization = authorization.to_str().map_err(|_| {
            debug!("Authorization header is not valid UTF-8");
            ApiError::unauthenticated()
        })?;

        // "Bearer <token>": the token is the second whitespace-separated
        // segment, a bare scheme with nothing after it is rejected
        let Some(token) = authorization.split_whitespace().nth(1) else {
            debug!("Authorization header has no token segment");
            return Err(ApiError::unauthenticated());
        };

        let claims = jwt::verify_hs256(
            token,
            self.secret.expose_secret().as_bytes(),
            Utc::now().timestamp(),
        )
        .map_err(|err| {
            debug!("Token verification failed: {err}");
            ApiError::unauthenticated()
        })?;

        let user_id = Uuid::parse_str(&claims.id).map_err(|err| {
            debug!("Token id claim is not a valid UUID: {err}");
            ApiError::unauthenticated()
        })?;

        Ok(Identity { user_id })
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}

/// Middleware guarding protected routes: verifies the bearer token and makes
/// the [`Identity`] available to handlers via request extensions.
pub async fn require_auth(
    State(verifier): State<Verifier>,
    mut request: Request,
    next: Next,
) -> Response {
    match verifier.verify(request.headers()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn verifier() -> Verifier {
        Verifier::new(SecretString::from("S"))
    }

    async fn whoami(Extension(identity): Extension<Identity>) -> String {
        identity.user_id.to_string()
    }

    fn app(verifier: Verifier) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(verifier, require_auth))
    }

    fn request(authorization: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_identity() {
        let verifier = verifier();
        let user_id = Uuid::new_v4();
        let token = verifier.issue(user_id).unwrap();

        let response = app(verifier)
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], user_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let response = app(verifier()).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 401);
        assert_eq!(json["message"], "You are not authenticated!");
    }

    #[tokio::test]
    async fn header_without_token_segment_is_rejected() {
        let response = app(verifier())
            .oneshot(request(Some("Bearer")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let other = Verifier::new(SecretString::from("T"));
        let token = other.issue(Uuid::new_v4()).unwrap();

        let response = app(verifier())
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let past = Utc::now().timestamp() - 60;
        let claims = jwt::Claims {
            id: Uuid::new_v4().to_string(),
            iat: past - TOKEN_EXPIRATION,
            exp: Some(past),
        };
        let token = jwt::sign_hs256(b"S", &claims).unwrap();

        let response = app(verifier())
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_uuid_id_claim_is_rejected() {
        let claims = jwt::Claims {
            id: "u1".to_string(),
            iat: Utc::now().timestamp(),
            exp: None,
        };
        let token = jwt::sign_hs256(b"S", &claims).unwrap();

        let response = app(verifier())
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn verify_is_idempotent_per_request() {
        let verifier = verifier();
        let token = verifier.issue(Uuid::new_v4()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let first = verifier.verify(&headers);
        let second = verifier.verify(&headers);
        assert_eq!(first, second);
    }
}
