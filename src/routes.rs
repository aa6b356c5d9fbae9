use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::csrf_protection;
use crate::services::csrf::CSRF_HEADER_NAME;
use crate::state::AppState;

/// Router の構築
///
/// 状態を変更する全リクエストに CSRF 検証を適用する
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.client_origin.as_deref());

    let router = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/csrf", get(handlers::csrf_token))
        // 認証
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/logoutall", post(handlers::logout_all))
        .route("/api/auth/profile", get(handlers::profile))
        .route("/api/auth/reset-password", post(handlers::request_password_reset))
        .route("/api/auth/update-password", post(handlers::reset_password))
        // 応募記録
        .route(
            "/api/applications",
            get(handlers::list_applications).post(handlers::create_application),
        )
        .route(
            "/api/applications/statistics",
            get(handlers::application_statistics),
        )
        .route(
            "/api/applications/{id}",
            get(handlers::get_application)
                .put(handlers::update_application)
                .delete(handlers::delete_application),
        )
        .route("/api/stages", get(handlers::list_stages))
        .layer(middleware::from_fn_with_state(state.clone(), csrf_protection))
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// フロントエンドのオリジンが設定されている場合のみ CORS を許可
fn cors_layer(client_origin: Option<&str>) -> Option<CorsLayer> {
    let origin = client_origin?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(error = ?e, origin = %origin, "CLIENT_ORIGIN が不正なため CORS を無効化");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(CSRF_HEADER_NAME),
            ])
            .expose_headers([HeaderName::from_static(CSRF_HEADER_NAME)]),
    )
}
