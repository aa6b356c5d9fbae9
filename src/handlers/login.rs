use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::models::UserProfile;
use crate::services::csrf::CSRF_HEADER_NAME;
use crate::services::{AuthService, AuthSession, SessionBinding};
use crate::state::AppState;

pub(crate) const MISSING_FIELDS_MESSAGE: &str = "Please provide all the required fields";

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// ログイン・登録レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    /// 新しいトークンに束縛し直した CSRF トークン
    pub csrf_token: String,
}

/// ログインハンドラー
///
/// POST /api/auth/login
///
/// 処理フロー:
/// 1. ログイン済み（Authorization ヘッダーあり）なら拒否
/// 2. リクエストバリデーション
/// 3. ユーザー認証・トークン発行
/// 4. CSRFトークンを新しいトークンに束縛し直して返却
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    reject_if_authenticated(&headers)?;
    let (email, password) = validate_login_request(&request)?;

    let session = AuthService::new(state.user_repo.clone())
        .login(email, password)
        .await?;

    Ok(session_response(&state, StatusCode::OK, session))
}

/// Authorization ヘッダー付きのログイン・登録を拒否
pub(crate) fn reject_if_authenticated(headers: &HeaderMap) -> Result<(), AppError> {
    if headers.contains_key(header::AUTHORIZATION) {
        return Err(AppError::AlreadyAuthenticated);
    }
    Ok(())
}

/// 発行したセッションを CSRF トークン付きで返す
///
/// トークンは Cookie・`x-csrf-token` ヘッダー・本文の3箇所で返す
pub(crate) fn session_response(state: &AppState, status: StatusCode, session: AuthSession) -> Response {
    let csrf_token = state
        .csrf_service
        .issue(&SessionBinding::credential(&session.token));

    let headers = [
        (header::SET_COOKIE, state.csrf_service.csrf_cookie(&csrf_token)),
        (HeaderName::from_static(CSRF_HEADER_NAME), csrf_token.clone()),
    ];

    (
        status,
        AppendHeaders(headers),
        Json(AuthResponse {
            user: UserProfile::from(&session.user),
            token: session.token,
            csrf_token,
        }),
    )
        .into_response()
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(&str, &str), AppError> {
    let password = request.password.as_deref().filter(|p| !p.is_empty());
    match (non_empty(&request.email), password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
    }
}

/// 未指定・空白のみを None として扱う
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
