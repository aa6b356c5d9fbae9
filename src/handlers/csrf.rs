use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Serialize;

use crate::middleware::session_binding;
use crate::services::SessionBinding;
use crate::services::csrf::new_session_id;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    pub token: String,
}

/// CSRFトークン取得ハンドラー
///
/// GET /api/csrf
///
/// 未ログインかつ匿名セッションがなければ `sid` Cookie を発行し、そのセッションに束縛したトークンを返す。
pub async fn csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut set_cookies = Vec::with_capacity(2);

    let binding = match session_binding(&headers) {
        Some(binding) => binding,
        None => {
            let sid = new_session_id();
            set_cookies.push(state.csrf_service.session_cookie(&sid));
            SessionBinding::Anonymous(sid)
        }
    };

    let token = state.csrf_service.issue(&binding);
    set_cookies.push(state.csrf_service.csrf_cookie(&token));

    (
        StatusCode::CREATED,
        AppendHeaders(set_cookies.into_iter().map(|cookie| (header::SET_COOKIE, cookie))),
        Json(CsrfResponse { token }),
    )
        .into_response()
}
