//! 永続化層
//!
//! 各ストアはトレイトで定義し、PostgreSQL 実装とインメモリ実装を持つ。
//! トークン集合の追加・削除は単一の操作として実装する（読み込み→保存による更新の取りこぼしを防ぐ）。

pub mod application;
pub mod memory;
pub mod stage;
pub mod user;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Application, ApplicationChanges, NewApplication, NewStage, NewUser, Stage, User};

pub use application::ApplicationRepository;
pub use memory::MemoryStore;
pub use stage::StageRepository;
pub use user::UserRepository;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// # Errors
    /// メールアドレス重複時は `AppError::EmailAlreadyExists`
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    /// トークンダイジェストを保持しているユーザーを検索
    async fn find_by_token(&self, token_hash: &str) -> Result<Option<User>, AppError>;

    async fn add_token(&self, user_id: Uuid, token_hash: &str) -> Result<(), AppError>;

    /// 該当トークンのみ削除（存在しなくてもエラーにしない）
    async fn remove_token(&self, user_id: Uuid, token_hash: &str) -> Result<(), AppError>;

    /// 全トークンを削除し、削除件数を返す
    async fn clear_tokens(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// 保留中のリセットトークンを上書き保存
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError>;

    /// 有効なリセットトークンを消費してパスワードを更新
    ///
    /// トークン一致かつ `now` より後に期限切れとなるユーザーがいれば、
    /// パスワードを更新しトークンと期限をクリアしてユーザーIDを返す
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<Uuid>, AppError>;
}

#[async_trait]
pub trait StageStore: Send + Sync {
    /// `number` 昇順で全件取得
    async fn list(&self) -> Result<Vec<Stage>, AppError>;

    async fn find_by_id(&self, stage_id: Uuid) -> Result<Option<Stage>, AppError>;

    /// `number` が最小のステージ（新規応募の既定ステージ）
    async fn find_default(&self) -> Result<Option<Stage>, AppError>;

    /// ステージが1件もなければ投入し、投入件数を返す
    async fn seed(&self, stages: &[NewStage]) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Application>, AppError>;

    /// 所有者以外からは存在しないものとして扱う
    async fn find_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError>;

    async fn create(
        &self,
        user_id: Uuid,
        stage_id: Uuid,
        application: &NewApplication,
    ) -> Result<Application, AppError>;

    /// 部分更新（`date_modified` を更新）
    async fn update_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
        changes: &ApplicationChanges,
    ) -> Result<Option<Application>, AppError>;

    /// 削除できた場合 true
    async fn delete_for_user(&self, application_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
}

/// ストア一式
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub stages: Arc<dyn StageStore>,
    pub applications: Arc<dyn ApplicationStore>,
}

impl Stores {
    /// PostgreSQL ストア
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            stages: Arc::new(StageRepository::new(pool.clone())),
            applications: Arc::new(ApplicationRepository::new(pool)),
        }
    }

    /// インメモリストア（開発・テスト用）
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            stages: store.clone(),
            applications: store,
        }
    }
}
