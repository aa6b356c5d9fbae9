use axum::{
    Json,
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::AuthService;
use crate::state::AppState;

/// メッセージのみのレスポンス
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// ログアウトハンドラー
///
/// POST /api/auth/logout
///
/// 提示されたトークンのみ失効させ、CSRF / セッション Cookie を削除する
pub async fn logout(
    State(state): State<AppState>,
    AuthUser { user, token }: AuthUser,
) -> Result<Response, AppError> {
    AuthService::new(state.user_repo.clone())
        .logout(user.id, &token)
        .await?;

    Ok(cleared_session_response(
        &state,
        "User logged out successfully.",
    ))
}

/// 全デバイスログアウトハンドラー
///
/// POST /api/auth/logoutall
pub async fn logout_all(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> Result<Response, AppError> {
    AuthService::new(state.user_repo.clone())
        .logout_all(user.id)
        .await?;

    Ok(cleared_session_response(
        &state,
        "User logged out from all devices successfully.",
    ))
}

fn cleared_session_response(state: &AppState, message: &str) -> Response {
    let cookies = state
        .csrf_service
        .clear_cookies()
        .map(|cookie| (header::SET_COOKIE, cookie));

    (AppendHeaders(cookies), Json(MessageResponse::new(message))).into_response()
}
