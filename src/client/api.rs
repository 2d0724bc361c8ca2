use crate::client::credentials::{CredentialStore, StoreError};
use crate::client::types::{
    AuthResponse, CartItem, CartUpdate, FavoriteUpdate, Order, OrderPayload, Product,
    ProductFilter, SigninPayload, SignupPayload,
};
use crate::krist::APP_USER_AGENT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the token (or its absence) with a 401. The stored
    /// token has already been cleared; the caller should prompt a re-login.
    #[error("not authenticated")]
    Unauthenticated,
    #[error("request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("network error")]
    Network(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error body returned by the server: `{ "status": ..., "message": ... }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Storefront API client. Protected calls are decorated with the bearer
/// token currently held by the credential store; if the store is unreadable
/// the request goes out unauthenticated and the server rejects it.
#[derive(Clone)]
pub struct Api {
    http: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
}

impl Api {
    /// Build a client against `base_url` (e.g. `http://localhost:8080`).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attach `Authorization: Bearer <token>` when the store holds a token.
    /// A store read failure degrades to an unauthenticated request.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.store.get() {
            Ok(Some(token)) => builder.bearer_auth(token),
            Ok(None) => builder,
            Err(err) => {
                debug!("Credential store unreadable, sending unauthenticated: {err}");
                builder
            }
        }
    }

    /// Map a 401 to `Unauthenticated` (clearing the stored token) and any
    /// other non-2xx status to `Http`, passing successful responses through.
    async fn check_status(&self, response: Response) -> Result<Response, ClientError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // The token no longer grants access: drop it so the session and
            // the store stay in sync
            if let Err(err) = self.store.clear() {
                debug!("Failed to clear rejected token: {err}");
            }
            return Err(ClientError::Unauthenticated);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn handle<T: DeserializeOwned>(&self, response: Response) -> Result<T, ClientError> {
        Ok(self.check_status(response).await?.json::<T>().await?)
    }

    async fn handle_empty(&self, response: Response) -> Result<(), ClientError> {
        self.check_status(response).await.map(|_| ())
    }

    /// Create an account; the response carries a freshly issued token.
    ///
    /// # Errors
    /// Fails on network errors or a non-2xx response.
    pub async fn signup(&self, payload: &SignupPayload) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/user/signup"))
            .json(payload)
            .send()
            .await?;
        self.handle(response).await
    }

    /// Sign in; the response carries a freshly issued token.
    ///
    /// # Errors
    /// Fails on network errors or a non-2xx response.
    pub async fn signin(&self, payload: &SigninPayload) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/user/signin"))
            .json(payload)
            .send()
            .await?;
        self.handle(response).await
    }

    /// List products, optionally filtered.
    ///
    /// # Errors
    /// Fails on network errors or a non-2xx response.
    pub async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/products"))
            .query(filter)
            .send()
            .await?;
        self.handle(response).await
    }

    /// Fetch a single product.
    ///
    /// # Errors
    /// Fails on network errors or a non-2xx response.
    pub async fn product_details(&self, id: Uuid) -> Result<Product, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/products/{id}")))
            .send()
            .await?;
        self.handle(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn get_cart(&self) -> Result<Vec<CartItem>, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/api/user/cart")))
            .send()
            .await?;
        self.handle(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn add_to_cart(&self, update: &CartUpdate) -> Result<(), ClientError> {
        let response = self
            .authorize(self.http.post(self.url("/api/user/cart")).json(update))
            .send()
            .await?;
        self.handle_empty(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn remove_from_cart(&self, update: &CartUpdate) -> Result<(), ClientError> {
        let response = self
            .authorize(self.http.patch(self.url("/api/user/cart")).json(update))
            .send()
            .await?;
        self.handle_empty(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn get_favorites(&self) -> Result<Vec<Product>, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/api/user/favorite")))
            .send()
            .await?;
        self.handle(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn add_favorite(&self, update: &FavoriteUpdate) -> Result<(), ClientError> {
        let response = self
            .authorize(self.http.post(self.url("/api/user/favorite")).json(update))
            .send()
            .await?;
        self.handle_empty(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn remove_favorite(&self, update: &FavoriteUpdate) -> Result<(), ClientError> {
        let response = self
            .authorize(self.http.patch(self.url("/api/user/favorite")).json(update))
            .send()
            .await?;
        self.handle_empty(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn place_order(&self, payload: &OrderPayload) -> Result<Order, ClientError> {
        let response = self
            .authorize(self.http.post(self.url("/api/user/order")).json(payload))
            .send()
            .await?;
        self.handle(response).await
    }

    /// # Errors
    /// Fails on network errors, a 401, or another non-2xx response.
    pub async fn get_orders(&self) -> Result<Vec<Order>, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/api/user/order")))
            .send()
            .await?;
        self.handle(response).await
    }

    #[cfg(test)]
    pub(crate) fn build_get(&self, path: &str) -> reqwest::Request {
        self.authorize(self.http.get(self.url(path)))
            .build()
            .expect("request builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::credentials::MemoryStore;
    use reqwest::header::AUTHORIZATION;

    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }

        fn set(&self, _token: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }

        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }
    }

    #[test]
    fn authorize_attaches_bearer_header() {
        let store = Arc::new(MemoryStore::new());
        store.set("abc.def.ghi").unwrap();

        let api = Api::new("http://localhost:8080", store).unwrap();
        let request = api.build_get("/api/user/cart");

        let header = request.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer abc.def.ghi");
    }

    #[test]
    fn authorize_omits_header_when_logged_out() {
        let api = Api::new("http://localhost:8080", Arc::new(MemoryStore::new())).unwrap();
        let request = api.build_get("/api/user/cart");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn authorize_fails_open_on_broken_store() {
        let api = Api::new("http://localhost:8080", Arc::new(BrokenStore)).unwrap();
        let request = api.build_get("/api/user/cart");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = Api::new("http://localhost:8080/", Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(api.url("/api/products"), "http://localhost:8080/api/products");
    }

    fn response(status: u16, body: &str) -> Response {
        axum::http::Response::builder()
            .status(status)
            .body(body.to_string())
            .map(Response::from)
            .unwrap()
    }

    #[tokio::test]
    async fn rejected_token_is_cleared_from_the_store() {
        let store = Arc::new(MemoryStore::new());
        store.set("abc.def.ghi").unwrap();

        let api = Api::new("http://localhost:8080", store.clone()).unwrap();
        let result = api
            .handle_empty(response(
                401,
                r#"{"status":401,"message":"You are not authenticated!"}"#,
            ))
            .await;

        assert!(matches!(result, Err(ClientError::Unauthenticated)));
        assert_eq!(store.get().unwrap(), None);
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let api = Api::new("http://localhost:8080", Arc::new(MemoryStore::new())).unwrap();

        let result: Result<Vec<Product>, ClientError> = api
            .handle(response(
                404,
                r#"{"status":404,"message":"Product not found"}"#,
            ))
            .await;

        match result {
            Err(ClientError::Http { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Product not found");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_and_typed_handlers_share_status_mapping() {
        let api = Api::new("http://localhost:8080", Arc::new(MemoryStore::new())).unwrap();

        let empty = api.handle_empty(response(500, "not json")).await;
        let typed: Result<Vec<Product>, ClientError> =
            api.handle(response(500, "not json")).await;

        for result in [empty.map(|()| ()), typed.map(|_| ())] {
            match result {
                Err(ClientError::Http { status, message }) => {
                    assert_eq!(status, 500);
                    assert_eq!(message, "Internal Server Error");
                }
                other => panic!("expected Http error, got {other:?}"),
            }
        }
    }
}
