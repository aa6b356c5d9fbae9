//! エラー応答を `AppError` の形式に揃えた抽出器
//!
//! axum 標準の `Json` / `Path` は失敗時にプレーンテキストを返すため、ここで `{"error": ...}` に変換する

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;

use crate::error::AppError;

pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
pub const INVALID_PATH_MESSAGE: &str = "Invalid resource id";

/// JSON リクエストボディ
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), error = %rejection.body_text(), "リクエストボディの解析に失敗");
                Err(AppError::Validation(INVALID_BODY_MESSAGE.to_string()))
            }
        }
    }
}

/// パスパラメーター
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), error = %rejection.body_text(), "パスパラメーターの解析に失敗");
                Err(AppError::Validation(INVALID_PATH_MESSAGE.to_string()))
            }
        }
    }
}
