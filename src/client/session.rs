use uuid::Uuid;

use super::api::{ApiClient, AuthPayload, ClientError, RequestConfig};
use crate::models::{Application, ApplicationChanges, NewApplication, Stage, UserProfile};
use crate::views::{ApplicationBoard, Statistics};

/// ログイン中の資格情報
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: UserProfile,
    pub token: String,
    /// ログイン時にローテーションされた CSRF トークン
    pub csrf_token: String,
}

impl From<AuthPayload> for Credentials {
    fn from(payload: AuthPayload) -> Self {
        Self {
            user: payload.user,
            token: payload.token,
            csrf_token: payload.csrf_token,
        }
    }
}

/// クライアントセッション
///
/// 資格情報と応募記録ボードを保持する。401 または CSRF 拒否を受けたら資格情報を破棄する。
pub struct ClientSession {
    api: ApiClient,
    credentials: Option<Credentials>,
    board: ApplicationBoard,
}

impl ClientSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            credentials: None,
            board: ApplicationBoard::new(),
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn board(&self) -> &ApplicationBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut ApplicationBoard {
        &mut self.board
    }

    /// 新規登録（匿名 CSRF トークンを取得してから送信）
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<&UserProfile, ClientError> {
        let config = self.anonymous_config().await?;
        let payload = self.api.register(&config, name, email, password).await?;
        Ok(self.store_credentials(payload))
    }

    /// ログイン（匿名 CSRF トークンを取得してから送信）
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&UserProfile, ClientError> {
        let config = self.anonymous_config().await?;
        let payload = self.api.login(&config, email, password).await?;
        Ok(self.store_credentials(payload))
    }

    /// ログアウト（サーバーの応答に関わらずローカルの資格情報は破棄）
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.logout(&config).await;
        self.clear();
        result.map(|_| ())
    }

    /// 全端末からログアウト
    pub async fn logout_all(&mut self) -> Result<(), ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.logout_all(&config).await;
        self.clear();
        result.map(|_| ())
    }

    pub async fn profile(&mut self) -> Result<UserProfile, ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.profile(&config).await;
        self.guard(result)
    }

    /// パスワードリセットを依頼
    pub async fn request_password_reset(&mut self, email: &str) -> Result<String, ClientError> {
        let config = self.current_config().await?;
        let result = self.api.request_password_reset(&config, email).await;
        Ok(self.guard(result)?.message)
    }

    /// リセットトークンで新しいパスワードを設定
    pub async fn update_password(&mut self, token: &str, password: &str) -> Result<String, ClientError> {
        let config = self.current_config().await?;
        let result = self.api.update_password(&config, token, password).await;
        Ok(self.guard(result)?.message)
    }

    /// 応募記録一覧を取得してボードを置き換える
    pub async fn fetch_applications(&mut self) -> Result<&[Application], ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.list_applications(&config).await;
        let applications = self.guard(result)?;
        self.board.replace_all(applications);
        Ok(self.board.applications())
    }

    pub async fn add_application(
        &mut self,
        input: &NewApplication,
    ) -> Result<Application, ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.create_application(&config, input).await;
        let application = self.guard(result)?;
        self.board.upsert(application.clone());
        Ok(application)
    }

    pub async fn update_application(
        &mut self,
        id: Uuid,
        changes: &ApplicationChanges,
    ) -> Result<Application, ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.update_application(&config, id, changes).await;
        let application = self.guard(result)?;
        self.board.upsert(application.clone());
        Ok(application)
    }

    pub async fn delete_application(&mut self, id: Uuid) -> Result<(), ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.delete_application(&config, id).await;
        self.guard(result)?;
        self.board.remove(id);
        Ok(())
    }

    /// サーバー側で集計した統計（ボードはローカルで同じ集計を持つ）
    pub async fn statistics(&mut self) -> Result<Statistics, ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.statistics(&config).await;
        self.guard(result)
    }

    pub async fn stages(&mut self) -> Result<Vec<Stage>, ClientError> {
        let config = self.authenticated_config()?;
        let result = self.api.stages(&config).await;
        self.guard(result)
    }

    async fn anonymous_config(&self) -> Result<RequestConfig, ClientError> {
        let csrf = self.api.fetch_csrf(&RequestConfig::default()).await?;
        Ok(RequestConfig::anonymous(csrf))
    }

    /// ログイン中は保存済みの資格情報を使う
    ///
    /// 匿名トークンを取得すると Cookie ストアの CSRF トークンが上書きされ、
    /// 保存済みトークンと一致しなくなる
    async fn current_config(&self) -> Result<RequestConfig, ClientError> {
        match self.credentials {
            Some(_) => self.authenticated_config(),
            None => self.anonymous_config().await,
        }
    }

    /// 未ログインならリクエストを送らずに `Unauthorized`
    fn authenticated_config(&self) -> Result<RequestConfig, ClientError> {
        self.credentials
            .as_ref()
            .map(|c| RequestConfig::authenticated(&c.token, &c.csrf_token))
            .ok_or(ClientError::Unauthorized)
    }

    fn store_credentials(&mut self, payload: AuthPayload) -> &UserProfile {
        tracing::debug!(user_id = %payload.user.id, "資格情報を保存");
        self.board = ApplicationBoard::new();
        &self.credentials.insert(Credentials::from(payload)).user
    }

    fn guard<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(error) = &result
            && error.requires_reauthentication()
        {
            tracing::info!(error = %error, "資格情報を破棄");
            self.clear();
        }
        result
    }

    fn clear(&mut self) {
        self.credentials = None;
        self.board = ApplicationBoard::new();
    }
}
