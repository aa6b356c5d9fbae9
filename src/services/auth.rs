use std::sync::{Arc, LazyLock};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::repositories::UserStore;
use crate::services::token::{generate_token, hash_token};

/// パスワードポリシーで許可する記号
pub const PASSWORD_SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>-";

const PASSWORD_MIN_LENGTH: usize = 8;

/// ユーザー不在時の検証に使うダミーハッシュ
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("dummy-password").ok());

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// パスワードを検証
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// パスワードポリシー検証
///
/// 8文字以上、大文字・小文字・数字・記号をそれぞれ1文字以上含むこと
pub fn validate_password_policy(password: &str) -> Result<(), AppError> {
    let long_enough = password.chars().count() >= PASSWORD_MIN_LENGTH;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| PASSWORD_SPECIAL_CHARACTERS.contains(c));

    if long_enough && has_upper && has_lower && has_digit && has_special {
        Ok(())
    } else {
        Err(AppError::PasswordPolicy)
    }
}

/// 発行済みセッション（ユーザーと平文のベアラートークン）
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// 認証サービス
///
/// ベアラートークンの発行・検証・失効を扱う。ストアにはトークンのダイジェストのみ保存する。
#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserStore>,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(user_repo: Arc<dyn UserStore>) -> Self {
        Self { user_repo }
    }

    /// ユーザー登録
    ///
    /// # Security
    /// - パスワードはログに出力しない
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        validate_password_policy(password)?;

        let password_hash = hash_password(password)?;
        let user = self
            .user_repo
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        let token = self.issue_token(user.id).await?;
        tracing::info!(user_id = %user.id, "ユーザー登録成功");

        Ok(AuthSession { user, token })
    }

    /// ログイン
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let user = self.user_repo.find_by_email(email).await?;

        let user = match user {
            Some(user) => {
                if !verify_password(password, &user.password_hash)? {
                    tracing::warn!(email = %email, "認証失敗: パスワード不一致");
                    return Err(AppError::Authentication);
                }
                user
            }
            None => {
                if let Some(dummy_hash) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(password, dummy_hash);
                }
                tracing::warn!(email = %email, "認証失敗: ユーザー不在");
                return Err(AppError::Authentication);
            }
        };

        let token = self.issue_token(user.id).await?;
        tracing::info!(user_id = %user.id, "ログイン成功");

        Ok(AuthSession { user, token })
    }

    /// 提示されたトークンのみ失効（既に失効済みでも成功）
    pub async fn logout(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        self.user_repo
            .remove_token(user_id, &hash_token(token))
            .await?;
        tracing::info!(user_id = %user_id, "ログアウト");
        Ok(())
    }

    /// 全デバイスのトークンを失効
    pub async fn logout_all(&self, user_id: Uuid) -> Result<(), AppError> {
        let removed = self.user_repo.clear_tokens(user_id).await?;
        tracing::info!(user_id = %user_id, removed, "全デバイスからログアウト");
        Ok(())
    }

    /// ベアラートークンからユーザーを解決
    ///
    /// # Errors
    /// トークンを保持するユーザーがいなければ `AppError::AuthenticationFailed`
    pub async fn authenticate_token(&self, token: &str) -> Result<User, AppError> {
        self.user_repo
            .find_by_token(&hash_token(token))
            .await?
            .ok_or(AppError::AuthenticationFailed)
    }

    /// プロフィール取得
    pub async fn profile(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn issue_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_token();
        self.user_repo
            .add_token(user_id, &hash_token(&token))
            .await?;
        Ok(token)
    }
}
