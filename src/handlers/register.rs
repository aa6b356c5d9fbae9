use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

use super::login::{MISSING_FIELDS_MESSAGE, non_empty, reject_if_authenticated, session_response};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>, // SecretBox不要（Deserialize後すぐハッシュ化）
}

/// 検証済みの登録内容
#[derive(Debug, PartialEq)]
struct Registration<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// ユーザー登録ハンドラー
///
/// POST /api/auth/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Response, AppError> {
    reject_if_authenticated(&headers)?;
    let registration = validate_register_request(&request)?;

    let session = AuthService::new(state.user_repo.clone())
        .register(registration.name, registration.email, registration.password)
        .await?;

    Ok(session_response(&state, StatusCode::CREATED, session))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<Registration<'_>, AppError> {
    let (Some(name), Some(email), Some(password)) = (
        non_empty(&request.name),
        non_empty(&request.email),
        request.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
    };

    if !email.contains('@') {
        return Err(AppError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }

    Ok(Registration {
        name,
        email,
        password,
    })
}
