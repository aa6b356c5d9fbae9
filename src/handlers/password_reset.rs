use axum::{Json, extract::State};
use serde::Deserialize;

use super::login::MISSING_FIELDS_MESSAGE;
use super::logout::MessageResponse;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::services::PasswordResetService;
use crate::state::AppState;

const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/auth/reset-password
///
/// # Security
/// ユーザー不在でも同じ200を返す（ユーザー存在有無を漏洩しない）
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetRequestRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = validate_email(request.email.as_deref())?;

    let password_reset_service = PasswordResetService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    match password_reset_service.request_reset(email).await {
        Ok(()) => {}
        Err(AppError::UserNotFound) => {
            tracing::info!(email = %email, "パスワードリセット: ユーザー不在（成功レスポンス返却）");
        }
        Err(e) => return Err(e),
    }

    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/auth/update-password
///
/// # Security
/// - token, password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (token, password) = validate_reset_password_request(&request)?;

    let password_reset_service = PasswordResetService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    password_reset_service.reset_password(token, password).await?;

    Ok(Json(MessageResponse::new("Password has been updated.")))
}

/// メールアドレスのバリデーション
fn validate_email(email: Option<&str>) -> Result<&str, AppError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }
    Ok(email)
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(
    request: &ResetPasswordRequest,
) -> Result<(&str, &str), AppError> {
    let token = request.token.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let password = request.password.as_deref().filter(|p| !p.is_empty());
    match (token, password) {
        (Some(token), Some(password)) => Ok((token, password)),
        _ => Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
    }
}
