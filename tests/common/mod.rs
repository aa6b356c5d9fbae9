//! 統合テスト共通ヘルパー
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use jobtrack::config::Config;
use jobtrack::models::DEFAULT_STAGES;
use jobtrack::repositories::Stores;
use jobtrack::routes::create_router;
use jobtrack::services::csrf::{CSRF_COOKIE_NAME, CSRF_HEADER_NAME, SESSION_COOKIE_NAME};
use jobtrack::services::{EmailService, Mailer};
use jobtrack::state::AppState;

pub const PASSWORD: &str = "Passw0rd!";
pub const RESET_URL_BASE: &str = "http://app.test/reset-password";

/// 送信メールを記録するメーラー
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    /// 最後に送られたリセットURLからトークンを取り出す
    pub fn last_reset_token(&self) -> Option<String> {
        let sent = self.sent.lock();
        let (_, body) = sent.last()?;
        let start = body.find(RESET_URL_BASE)? + RESET_URL_BASE.len() + 1;
        Some(
            body[start..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect(),
        )
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, _subject: &str, html_body: &str) -> anyhow::Result<()> {
        self.sent.lock().push((to.to_string(), html_body.to_string()));
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> anyhow::Result<()> {
        anyhow::bail!("smtp unavailable")
    }
}

pub fn test_config() -> Config {
    Config::from_pairs([
        ("CSRF_SECRET", "0123456789abcdef0123456789abcdef"),
        ("PASSWORD_RESET_URL_BASE", RESET_URL_BASE),
    ])
    .unwrap()
}

/// インメモリストアとステージ初期データで Router を構築
pub async fn test_router(mailer: Arc<dyn Mailer>) -> Router {
    let stores = Stores::memory();
    stores.stages.seed(DEFAULT_STAGES).await.unwrap();
    let state = AppState::new(stores, EmailService::new(mailer), test_config()).unwrap();
    create_router(state)
}

/// 匿名セッション（`sid` Cookie とそれに束縛された CSRF トークン）
#[derive(Debug, Clone)]
pub struct Anonymous {
    pub sid: String,
    pub csrf: String,
}

/// ログイン済みセッション
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub csrf: String,
    pub user: Value,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// Set-Cookie から Cookie 値を取り出す
pub fn set_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let router = test_router(mailer.clone()).await;
        Self { router, mailer }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET /api/csrf で匿名セッションを開始
    pub async fn anonymous(&self) -> Anonymous {
        let response = self
            .send(Request::get("/api/csrf").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        let csrf = response.body["token"].as_str().unwrap().to_string();
        assert_eq!(
            set_cookie_value(&response.headers, CSRF_COOKIE_NAME).as_deref(),
            Some(csrf.as_str())
        );
        Anonymous {
            sid: set_cookie_value(&response.headers, SESSION_COOKIE_NAME).unwrap(),
            csrf,
        }
    }

    /// 未ログイン状態の POST
    pub async fn anonymous_post(&self, path: &str, body: Value) -> TestResponse {
        let anonymous = self.anonymous().await;
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::COOKIE,
                format!(
                    "{SESSION_COOKIE_NAME}={}; {CSRF_COOKIE_NAME}={}",
                    anonymous.sid, anonymous.csrf
                ),
            )
            .header(CSRF_HEADER_NAME, &anonymous.csrf)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn register(&self, name: &str, email: &str) -> Session {
        let response = self
            .anonymous_post(
                "/api/auth/register",
                serde_json::json!({ "name": name, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        session_from(&response)
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.anonymous_post(
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// ベアラートークンと CSRF トークン付きのリクエスト
    pub async fn authed(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", session.token))
            .header(header::COOKIE, format!("{CSRF_COOKIE_NAME}={}", session.csrf))
            .header(CSRF_HEADER_NAME, &session.csrf);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }
}

pub fn session_from(response: &TestResponse) -> Session {
    Session {
        token: response.body["token"].as_str().unwrap().to_string(),
        csrf: response.body["csrfToken"].as_str().unwrap().to_string(),
        user: response.body["user"].clone(),
    }
}

/// エフェメラルポートでサーバーを起動し、ベースURLを返す
pub async fn spawn_server() -> String {
    let router = test_router(Arc::new(RecordingMailer::default())).await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
