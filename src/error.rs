use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// ログイン失敗時の共通メッセージ（ユーザー不在とパスワード不一致を区別しない）
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

/// CSRF 検証失敗を示すエラーコード（クライアントの再認証トリガー）
pub const CSRF_ERROR_CODE: &str = "EBADCSRFTOKEN";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("パスワードポリシー違反")]
    PasswordPolicy,

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("ログイン失敗")]
    Authentication,

    #[error("トークン認証失敗")]
    AuthenticationFailed,

    #[error("既にログイン済み")]
    AlreadyAuthenticated,

    #[error("CSRFトークン検証失敗")]
    CsrfValidation,

    #[error("リソースが見つかりません: {0}")]
    NotFound(&'static str),

    #[error("ユーザーが見つかりません")]
    UserNotFound,

    #[error("無効または期限切れのトークンです")]
    InvalidOrExpiredToken,

    #[error("メール送信エラー")]
    EmailDelivery(#[source] anyhow::Error),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl AppError {
    /// ステータスコードとクライアントに返すメッセージ
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::PasswordPolicy => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 8 characters long and contain at least one uppercase letter, one lowercase letter, one number, and one special character.".to_string(),
            ),
            Self::EmailAlreadyExists => (
                StatusCode::BAD_REQUEST,
                "User with that email already exists.".to_string(),
            ),
            Self::Authentication => (StatusCode::BAD_REQUEST, LOGIN_FAILED_MESSAGE.to_string()),
            Self::AuthenticationFailed => (
                StatusCode::UNAUTHORIZED,
                "Authentication failed.".to_string(),
            ),
            Self::AlreadyAuthenticated => (
                StatusCode::BAD_REQUEST,
                "Already authenticated.".to_string(),
            ),
            Self::CsrfValidation => (
                StatusCode::FORBIDDEN,
                "csrf validation error".to_string(),
            ),
            // 他ユーザーのリソース存在有無を漏洩しない
            Self::NotFound(resource) => (StatusCode::NOT_FOUND, format!("{resource} not found")),
            Self::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            Self::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "Password reset token is invalid or has expired.".to_string(),
            ),
            Self::EmailDelivery(e) => {
                tracing::error!(error = ?e, "メール送信エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send email.".to_string(),
                )
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let code = match self {
            Self::CsrfValidation => {
                tracing::warn!("CSRFトークン検証失敗（CSRF攻撃またはセッション切れの可能性）");
                Some(CSRF_ERROR_CODE)
            }
            _ => None,
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code,
            }),
        )
            .into_response()
    }
}
