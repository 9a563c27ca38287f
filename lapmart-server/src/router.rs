//! Main [axum::Router] interface for webserver.

use crate::{
    app_state::AppState,
    routes::{fallback::notfound_404, health, ping, users},
    setups::ServerSetup,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Setup main router for application.
pub fn setup_app_router<S: ServerSetup>(app_state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
        ])
        .allow_origin(Any);

    let users_router = Router::new()
        .route("/signup", post(users::signup::<S>))
        .route("/resend-otp", post(users::resend_otp::<S>))
        .route("/verify-otp", post(users::verify_otp::<S>))
        .route("/login", post(users::login::<S>))
        .route("/logout", post(users::logout::<S>))
        .route("/reset-password", post(users::reset_password::<S>))
        .route("/set-new-password", post(users::set_new_password::<S>))
        .route("/me", get(users::me::<S>))
        .route("/profile/bio", put(users::update_bio::<S>))
        .route("/profile/image", put(users::update_image::<S>))
        .fallback(notfound_404)
        .layer(cors)
        .with_state(app_state.clone());

    let router = Router::new()
        .route("/ping", get(ping::get))
        .nest("/api/users", users_router)
        .fallback(notfound_404);

    let healthcheck_router = Router::new()
        .route("/healthcheck", get(health::healthcheck::<S>))
        .with_state(app_state);

    Router::merge(router, healthcheck_router)
}
