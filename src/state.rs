use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{ApplicationStore, StageStore, Stores, UserStore};
use crate::services::{CsrfService, EmailService};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    pub user_repo: Arc<dyn UserStore>,
    pub stage_repo: Arc<dyn StageStore>,
    pub application_repo: Arc<dyn ApplicationStore>,
    /// メールサービス
    pub email_service: EmailService,
    pub csrf_service: CsrfService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(stores: Stores, email_service: EmailService, config: Config) -> Result<Self, AppError> {
        let csrf_service =
            CsrfService::new(config.csrf_secret.expose_secret(), config.cookie_secure)?;

        Ok(Self {
            config: Arc::new(config),
            user_repo: stores.users,
            stage_repo: stores.stages,
            application_repo: stores.applications,
            email_service,
            csrf_service,
        })
    }
}
