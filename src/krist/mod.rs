#[allow(unused_imports)]
use crate::{
    cli::globals::GlobalArgs,
    krist::handlers::{
        cart::{__path_add_to_cart, __path_get_cart, __path_remove_from_cart},
        favorite::{__path_add_favorite, __path_get_favorites, __path_remove_favorite},
        health, health::__path_health,
        order::{__path_get_orders, __path_place_order},
        products::{__path_product_details, __path_products},
        signin, signup,
        user_signin::__path_signin,
        user_signup::__path_signup,
    },
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error;
pub mod handlers;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        signup,
        signin,
        products,
        product_details,
        get_cart,
        add_to_cart,
        remove_from_cart,
        get_favorites,
        add_favorite,
        remove_favorite,
        place_order,
        get_orders,
    ),
    components(
        schemas(
            handlers::AuthResponse,
            handlers::UserResponse,
            handlers::user_signup::SignupPayload,
            handlers::user_signin::SigninPayload,
            handlers::products::Product,
            handlers::cart::CartItem,
            handlers::cart::CartUpdate,
            handlers::favorite::FavoriteUpdate,
            handlers::order::Order,
            handlers::order::OrderLine,
            handlers::order::OrderPayload,
        )
    ),
    tags(
        (name = "krist", description = "E-commerce storefront API"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the router and serve it until interrupted.
/// # Errors
/// Returns an error if the database is unreachable or the listener cannot
/// bind.
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let verifier = auth::Verifier::new(globals.token_secret.clone());

    let cors = CorsLayer::new()
        // allow `GET`, `POST` and `PATCH` when accessing the resource
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        // allow requests from any origin
        .allow_origin(Any);

    // Routes that require a verified bearer token
    let protected = Router::new()
        .route(
            "/api/user/cart",
            get(handlers::get_cart)
                .post(handlers::add_to_cart)
                .patch(handlers::remove_from_cart),
        )
        .route(
            "/api/user/favorite",
            get(handlers::get_favorites)
                .post(handlers::add_favorite)
                .patch(handlers::remove_favorite),
        )
        .route(
            "/api/user/order",
            get(handlers::get_orders).post(handlers::place_order),
        )
        .route_layer(middleware::from_fn_with_state(
            verifier.clone(),
            auth::require_auth,
        ));

    let app = Router::new()
        .route("/api/products", get(handlers::products))
        .route("/api/products/:id", get(handlers::product_details))
        .route("/api/user/signup", post(handlers::signup))
        .route("/api/user/signin", post(handlers::signin))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(pool.clone()))
                .layer(Extension(verifier)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
