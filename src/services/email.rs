use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppError;

/// メール送信の抽象
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

/// 開発用メーラー（送信せずログ出力のみ）
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        // 本文にはリセットトークンが含まれるため出力しない
        tracing::info!(to = %to, subject = %subject, "メール送信（開発モード）");
        Ok(())
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpMailer;

#[cfg(feature = "email")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
    use secrecy::ExposeSecret;

    use super::Mailer;
    use crate::config::Config;

    /// SMTP メーラー（STARTTLS）
    pub struct SmtpMailer {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from_address: String,
    }

    impl SmtpMailer {
        /// SMTP 設定が揃っていない場合は None
        pub fn from_config(config: &Config) -> anyhow::Result<Option<Self>> {
            let (Some(host), Some(username), Some(password), Some(from_address)) = (
                &config.smtp_host,
                &config.smtp_username,
                &config.smtp_password,
                &config.smtp_from_address,
            ) else {
                return Ok(None);
            };

            let credentials = Credentials::new(
                username.expose_secret().clone(),
                password.expose_secret().clone(),
            );
            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                .port(config.smtp_port)
                .credentials(credentials)
                .build();

            Ok(Some(Self {
                transport,
                from_address: from_address.clone(),
            }))
        }
    }

    #[async_trait]
    impl Mailer for SmtpMailer {
        async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
            let message = Message::builder()
                .from(self.from_address.parse()?)
                .to(to.parse()?)
                .subject(subject)
                .header(ContentType::TEXT_HTML)
                .body(html_body.to_string())?;

            self.transport.send(message).await?;
            Ok(())
        }
    }
}

#[cfg(feature = "email")]
fn smtp_mailer(config: &Config) -> Result<Option<Arc<dyn Mailer>>, AppError> {
    let mailer = SmtpMailer::from_config(config).map_err(AppError::Internal)?;
    Ok(mailer.map(|m| Arc::new(m) as Arc<dyn Mailer>))
}

#[cfg(not(feature = "email"))]
fn smtp_mailer(_config: &Config) -> Result<Option<Arc<dyn Mailer>>, AppError> {
    Ok(None)
}

/// メール送信サービス
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// 設定からメーラーを選択
    ///
    /// `email` フィーチャー有効かつ SMTP 設定済みなら SMTP、それ以外はログ出力のみ
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        if let Some(mailer) = smtp_mailer(config)? {
            tracing::info!("SMTP メーラーを使用");
            return Ok(Self::new(mailer));
        }

        if config.smtp_configured() {
            tracing::warn!("SMTP 設定がありますが email フィーチャーが無効です（ログ出力のみ）");
        }
        Ok(Self::new(Arc::new(LogMailer)))
    }

    /// パスワードリセットメールを送信
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        reset_url: &str,
    ) -> Result<(), AppError> {
        let body = format!(
            "<p>You are receiving this because you (or someone else) requested a password reset for your account.</p>\
             <p>Please click the following link to choose a new password:</p>\
             <p><a href=\"{reset_url}\">{reset_url}</a></p>\
             <p>If you did not request this, please ignore this email and your password will remain unchanged.</p>"
        );

        self.mailer
            .send(to, "Password Reset", &body)
            .await
            .map_err(AppError::EmailDelivery)
    }
}
