use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};

use super::auth::bearer_token;
use crate::error::AppError;
use crate::services::csrf::{CSRF_COOKIE_NAME, CSRF_HEADER_NAME, SESSION_COOKIE_NAME};
use crate::services::SessionBinding;
use crate::state::AppState;

/// Cookie ヘッダーから指定名の値を取り出す
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// リクエストの CSRF 束縛先
///
/// ベアラートークンがあればそのダイジェスト、なければ匿名セッション Cookie
pub fn session_binding(headers: &HeaderMap) -> Option<SessionBinding> {
    if let Some(token) = bearer_token(headers) {
        return Some(SessionBinding::credential(token));
    }
    cookie_value(headers, SESSION_COOKIE_NAME)
        .filter(|sid| !sid.is_empty())
        .map(|sid| SessionBinding::Anonymous(sid.to_string()))
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// 状態を変更するリクエストの CSRF 検証
///
/// 認証より先に評価するため、トークン不一致は 401 ではなく 403 になる
pub async fn csrf_protection(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let binding = session_binding(headers);
    let header_token = headers
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok());
    let cookie_token = cookie_value(headers, CSRF_COOKIE_NAME);

    if let Err(e) = state
        .csrf_service
        .validate(binding.as_ref(), header_token, cookie_token)
    {
        tracing::warn!(method = %request.method(), path = %request.uri().path(), "CSRF検証失敗");
        return Err(e);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1; sid=abc"));
        headers.append(header::COOKIE, HeaderValue::from_static("x-csrf-token=t.s"));

        assert_eq!(cookie_value(&headers, "sid"), Some("abc"));
        assert_eq!(cookie_value(&headers, "x-csrf-token"), Some("t.s"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_binding_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sid=abc"));
        assert_eq!(
            session_binding(&headers),
            Some(SessionBinding::Anonymous("abc".to_string()))
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(
            session_binding(&headers),
            Some(SessionBinding::credential("tok"))
        );
    }

    #[test]
    fn test_no_binding_without_credentials() {
        assert_eq!(session_binding(&HeaderMap::new()), None);
    }
}
