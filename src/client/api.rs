use reqwest::{RequestBuilder, StatusCode, header};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::CSRF_ERROR_CODE;
use crate::models::{Application, ApplicationChanges, NewApplication, Stage, UserProfile};
use crate::services::csrf::CSRF_HEADER_NAME;
use crate::views::Statistics;

/// クライアント側のエラー
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("認証が必要です")]
    Unauthorized,

    #[error("CSRFトークン検証失敗")]
    CsrfRejected,

    #[error("APIエラー ({status}): {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// 資格情報を破棄して再ログインさせるべきエラーか（401 または CSRF 専用の 403）
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::CsrfRejected)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// 失敗レスポンスを分類
pub fn classify(status: StatusCode, body: &str) -> ClientError {
    let body: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        return ClientError::Unauthorized;
    }
    if status == StatusCode::FORBIDDEN && body.code.as_deref() == Some(CSRF_ERROR_CODE) {
        return ClientError::CsrfRejected;
    }

    ClientError::Api {
        status: status.as_u16(),
        message: body.error.unwrap_or_else(|| status.to_string()),
    }
}

/// リクエストごとの認証設定
///
/// 共有クライアントのヘッダーを書き換えず、呼び出しごとに明示的に渡す
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub bearer: Option<String>,
    pub csrf: Option<String>,
}

impl RequestConfig {
    /// 未ログイン時の状態変更リクエスト用
    pub fn anonymous(csrf: impl Into<String>) -> Self {
        Self {
            bearer: None,
            csrf: Some(csrf.into()),
        }
    }

    pub fn authenticated(bearer: impl Into<String>, csrf: impl Into<String>) -> Self {
        Self {
            bearer: Some(bearer.into()),
            csrf: Some(csrf.into()),
        }
    }

    fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(bearer) = &self.bearer {
            builder = builder.bearer_auth(bearer);
        }
        if let Some(csrf) = &self.csrf {
            builder = builder.header(CSRF_HEADER_NAME, csrf);
        }
        builder
    }
}

/// ログイン・登録の応答
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserProfile,
    pub token: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
struct CsrfPayload {
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    pub message: String,
}

/// REST API クライアント
///
/// Cookie ストアを有効にし、CSRF / セッション Cookie はサーバーの Set-Cookie に従って保持する
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// 新しい ApiClient を作成
    ///
    /// `base_url` 例: `http://localhost:3000`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        config: &RequestConfig,
    ) -> Result<T, ClientError> {
        let response = config
            .apply(builder)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify(status, &body);
            tracing::warn!(status = %status, error = %error, "APIリクエスト失敗");
            return Err(error);
        }

        Ok(response.json().await?)
    }

    /// 匿名（または現在のトークン）に束縛された CSRF トークンを取得
    pub async fn fetch_csrf(&self, config: &RequestConfig) -> Result<String, ClientError> {
        let payload: CsrfPayload = self
            .send(self.client.get(self.url("/csrf")), config)
            .await?;
        Ok(payload.token)
    }

    pub async fn register(
        &self,
        config: &RequestConfig,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, ClientError> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        self.send(self.client.post(self.url("/auth/register")).json(&body), config)
            .await
    }

    pub async fn login(
        &self,
        config: &RequestConfig,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, ClientError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send(self.client.post(self.url("/auth/login")).json(&body), config)
            .await
    }

    pub async fn logout(&self, config: &RequestConfig) -> Result<MessagePayload, ClientError> {
        self.send(self.client.post(self.url("/auth/logout")), config)
            .await
    }

    pub async fn logout_all(&self, config: &RequestConfig) -> Result<MessagePayload, ClientError> {
        self.send(self.client.post(self.url("/auth/logoutall")), config)
            .await
    }

    pub async fn profile(&self, config: &RequestConfig) -> Result<UserProfile, ClientError> {
        self.send(self.client.get(self.url("/auth/profile")), config)
            .await
    }

    pub async fn request_password_reset(
        &self,
        config: &RequestConfig,
        email: &str,
    ) -> Result<MessagePayload, ClientError> {
        let body = serde_json::json!({ "email": email });
        self.send(
            self.client.post(self.url("/auth/reset-password")).json(&body),
            config,
        )
        .await
    }

    pub async fn update_password(
        &self,
        config: &RequestConfig,
        token: &str,
        password: &str,
    ) -> Result<MessagePayload, ClientError> {
        let body = serde_json::json!({ "token": token, "password": password });
        self.send(
            self.client.post(self.url("/auth/update-password")).json(&body),
            config,
        )
        .await
    }

    pub async fn list_applications(
        &self,
        config: &RequestConfig,
    ) -> Result<Vec<Application>, ClientError> {
        self.send(self.client.get(self.url("/applications")), config)
            .await
    }

    pub async fn statistics(&self, config: &RequestConfig) -> Result<Statistics, ClientError> {
        self.send(self.client.get(self.url("/applications/statistics")), config)
            .await
    }

    pub async fn create_application(
        &self,
        config: &RequestConfig,
        input: &NewApplication,
    ) -> Result<Application, ClientError> {
        self.send(self.client.post(self.url("/applications")).json(input), config)
            .await
    }

    pub async fn update_application(
        &self,
        config: &RequestConfig,
        id: Uuid,
        changes: &ApplicationChanges,
    ) -> Result<Application, ClientError> {
        self.send(
            self.client
                .put(self.url(&format!("/applications/{id}")))
                .json(changes),
            config,
        )
        .await
    }

    pub async fn delete_application(
        &self,
        config: &RequestConfig,
        id: Uuid,
    ) -> Result<MessagePayload, ClientError> {
        self.send(
            self.client.delete(self.url(&format!("/applications/{id}"))),
            config,
        )
        .await
    }

    pub async fn stages(&self, config: &RequestConfig) -> Result<Vec<Stage>, ClientError> {
        self.send(self.client.get(self.url("/stages")), config)
            .await
    }
}
