use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::UserStore;
use crate::services::auth::{hash_password, validate_password_policy};
use crate::services::token::{generate_token, hash_token};
use crate::services::EmailService;

const DEFAULT_RESET_URL_BASE: &str = "http://localhost:3000/reset-password";

/// パスワードリセットサービス
#[derive(Clone)]
pub struct PasswordResetService {
    user_repo: Arc<dyn UserStore>,
    email_service: EmailService,
    config: Arc<Config>,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    pub fn new(user_repo: Arc<dyn UserStore>, email_service: EmailService, config: Arc<Config>) -> Self {
        Self {
            user_repo,
            email_service,
            config,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// メール送信に成功した場合のみトークンを保存する。保留中のトークンは上書きされる。
    ///
    /// # Errors
    /// - ユーザー不在: `AppError::UserNotFound`（外部への隠蔽はハンドラーで行う）
    /// - 送信失敗: `AppError::EmailDelivery`
    ///
    /// # Security
    /// - トークン（平文）はログに出力しない
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let token = generate_token();
        let expires_at =
            OffsetDateTime::now_utc() + Duration::seconds(self.config.password_reset_token_ttl_secs);

        let reset_url = self.build_reset_url(&token);
        self.email_service
            .send_password_reset_email(&user.email, &reset_url)
            .await?;

        self.user_repo
            .set_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// パスワードをリセット
    ///
    /// トークン照合・期限確認・パスワード更新・トークン消去はストアの単一操作で行う
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        validate_password_policy(new_password)?;

        let password_hash = hash_password(new_password)?;
        let user_id = self
            .user_repo
            .consume_reset_token(&hash_token(token), OffsetDateTime::now_utc(), &password_hash)
            .await?
            .ok_or_else(|| {
                tracing::warn!("無効または期限切れのリセットトークン");
                AppError::InvalidOrExpiredToken
            })?;

        tracing::info!(user_id = %user_id, "パスワードリセット完了");

        Ok(())
    }

    /// リセットURLを構築
    fn build_reset_url(&self, token: &str) -> String {
        let base = self
            .config
            .password_reset_url_base
            .as_deref()
            .unwrap_or(DEFAULT_RESET_URL_BASE);
        format!("{}/{}", base.trim_end_matches('/'), token)
    }
}
