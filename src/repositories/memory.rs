use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{ApplicationStore, StageStore, UserStore};
use crate::error::AppError;
use crate::models::application::DEFAULT_RANK;
use crate::models::{Application, ApplicationChanges, NewApplication, NewStage, NewUser, Stage, User};

#[derive(Default)]
struct MemoryData {
    users: HashMap<Uuid, User>,
    /// トークンダイジェスト → ユーザーID
    tokens: HashMap<String, Uuid>,
    stages: Vec<Stage>,
    /// 作成順を保持
    applications: Vec<Application>,
}

/// インメモリストア（開発・テスト用）
///
/// 各操作は書き込みロック内で完結するため、トークンの追加と全削除が競合しても取りこぼさない
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let data = self.data.read();
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.data.read().users.get(&user_id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut data = self.data.write();
        if data.users.values().any(|u| u.email == user.email) {
            return Err(AppError::EmailAlreadyExists);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            admin: false,
            reset_password_token_hash: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        };
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let data = self.data.read();
        Ok(data
            .tokens
            .get(token_hash)
            .and_then(|user_id| data.users.get(user_id))
            .cloned())
    }

    async fn add_token(&self, user_id: Uuid, token_hash: &str) -> Result<(), AppError> {
        self.data.write().tokens.insert(token_hash.to_string(), user_id);
        Ok(())
    }

    async fn remove_token(&self, user_id: Uuid, token_hash: &str) -> Result<(), AppError> {
        let mut data = self.data.write();
        if data.tokens.get(token_hash) == Some(&user_id) {
            data.tokens.remove(token_hash);
        }
        Ok(())
    }

    async fn clear_tokens(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut data = self.data.write();
        let before = data.tokens.len();
        data.tokens.retain(|_, owner| *owner != user_id);
        Ok((before - data.tokens.len()) as u64)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        if let Some(user) = self.data.write().users.get_mut(&user_id) {
            user.reset_password_token_hash = Some(token_hash.to_string());
            user.reset_password_expires = Some(expires_at);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<Uuid>, AppError> {
        let mut data = self.data.write();
        let user = data.users.values_mut().find(|u| {
            u.reset_password_token_hash.as_deref() == Some(token_hash)
                && u.reset_password_expires.is_some_and(|expires| expires > now)
        });

        Ok(user.map(|user| {
            user.password_hash = password_hash.to_string();
            user.reset_password_token_hash = None;
            user.reset_password_expires = None;
            user.updated_at = now;
            user.id
        }))
    }
}

#[async_trait]
impl StageStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Stage>, AppError> {
        let mut stages = self.data.read().stages.clone();
        stages.sort_by_key(|s| s.number);
        Ok(stages)
    }

    async fn find_by_id(&self, stage_id: Uuid) -> Result<Option<Stage>, AppError> {
        let data = self.data.read();
        Ok(data.stages.iter().find(|s| s.id == stage_id).cloned())
    }

    async fn find_default(&self) -> Result<Option<Stage>, AppError> {
        let data = self.data.read();
        Ok(data.stages.iter().min_by_key(|s| s.number).cloned())
    }

    async fn seed(&self, stages: &[NewStage]) -> Result<u64, AppError> {
        let mut data = self.data.write();
        if !data.stages.is_empty() {
            return Ok(0);
        }

        data.stages = stages
            .iter()
            .map(|s| Stage {
                id: Uuid::new_v4(),
                name: s.name.to_string(),
                stage_type: s.stage_type,
                number: s.number,
            })
            .collect();
        Ok(stages.len() as u64)
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Application>, AppError> {
        let data = self.data.read();
        Ok(data
            .applications
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        let data = self.data.read();
        Ok(data
            .applications
            .iter()
            .find(|a| a.id == application_id && a.user_id == user_id)
            .cloned())
    }

    async fn create(
        &self,
        user_id: Uuid,
        stage_id: Uuid,
        application: &NewApplication,
    ) -> Result<Application, AppError> {
        let mut data = self.data.write();
        let stage = data
            .stages
            .iter()
            .find(|s| s.id == stage_id)
            .cloned()
            .ok_or(AppError::NotFound("Stage"))?;

        let now = OffsetDateTime::now_utc();
        let created = Application {
            id: Uuid::new_v4(),
            user_id,
            stage,
            company: application.company.clone(),
            role: application.role.clone(),
            url: application.url.clone(),
            location: application.location.clone(),
            salary: application.salary.clone(),
            rank: application.rank.unwrap_or(DEFAULT_RANK),
            comments: application.comments.clone(),
            date_created: now,
            date_modified: now,
            date_applied: application.date_applied,
        };
        data.applications.push(created.clone());
        Ok(created)
    }

    async fn update_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
        changes: &ApplicationChanges,
    ) -> Result<Option<Application>, AppError> {
        let mut data = self.data.write();
        let stage = match changes.stage {
            Some(stage_id) => Some(
                data.stages
                    .iter()
                    .find(|s| s.id == stage_id)
                    .cloned()
                    .ok_or(AppError::NotFound("Stage"))?,
            ),
            None => None,
        };

        let Some(application) = data
            .applications
            .iter_mut()
            .find(|a| a.id == application_id && a.user_id == user_id)
        else {
            return Ok(None);
        };

        application.apply_changes(changes, stage, OffsetDateTime::now_utc());
        Ok(Some(application.clone()))
    }

    async fn delete_for_user(&self, application_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut data = self.data.write();
        let before = data.applications.len();
        data.applications
            .retain(|a| !(a.id == application_id && a.user_id == user_id));
        Ok(data.applications.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_STAGES;
    use time::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();

        let result = store.create_user(new_user("a@example.com")).await;
        assert!(matches!(result, Err(AppError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_token_add_remove_clear() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();

        store.add_token(user.id, "t1").await.unwrap();
        store.add_token(user.id, "t2").await.unwrap();
        assert!(store.find_by_token("t1").await.unwrap().is_some());

        store.remove_token(user.id, "t1").await.unwrap();
        assert!(store.find_by_token("t1").await.unwrap().is_none());
        assert!(store.find_by_token("t2").await.unwrap().is_some());

        // 既に削除済みでもエラーにならない
        store.remove_token(user.id, "t1").await.unwrap();

        assert_eq!(store.clear_tokens(user.id).await.unwrap(), 1);
        assert!(store.find_by_token("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_token_ignores_other_users_token() {
        let store = MemoryStore::new();
        let alice = store.create_user(new_user("a@example.com")).await.unwrap();
        let bob = store.create_user(new_user("b@example.com")).await.unwrap();

        store.add_token(alice.id, "alice-token").await.unwrap();
        store.remove_token(bob.id, "alice-token").await.unwrap();

        assert!(store.find_by_token("alice-token").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_consume_reset_token_is_single_use_and_checks_expiry() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        let now = OffsetDateTime::now_utc();

        store
            .set_reset_token(user.id, "reset", now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(
            store.consume_reset_token("reset", now, "new-hash").await.unwrap(),
            Some(user.id)
        );
        assert_eq!(
            store.consume_reset_token("reset", now, "other").await.unwrap(),
            None
        );

        let stored = UserStore::find_by_id(&store, user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.reset_password_token_hash.is_none());
        assert!(stored.reset_password_expires.is_none());

        store
            .set_reset_token(user.id, "expired", now - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(
            store.consume_reset_token("expired", now, "x").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let store = MemoryStore::new();
        assert_eq!(
            store.seed(DEFAULT_STAGES).await.unwrap(),
            DEFAULT_STAGES.len() as u64
        );
        assert_eq!(store.seed(DEFAULT_STAGES).await.unwrap(), 0);

        let default = store.find_default().await.unwrap().unwrap();
        assert_eq!(default.number, 1);
        assert_eq!(store.list().await.unwrap().len(), DEFAULT_STAGES.len());
    }

    #[tokio::test]
    async fn test_applications_are_owner_scoped() {
        let store = MemoryStore::new();
        store.seed(DEFAULT_STAGES).await.unwrap();
        let stage = store.find_default().await.unwrap().unwrap();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let created = store
            .create(
                owner,
                stage.id,
                &NewApplication {
                    company: "Acme".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.rank, DEFAULT_RANK);

        assert!(store.find_for_user(created.id, other).await.unwrap().is_none());
        assert!(
            store
                .update_for_user(created.id, other, &ApplicationChanges::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.delete_for_user(created.id, other).await.unwrap());

        assert!(store.delete_for_user(created.id, owner).await.unwrap());
        assert!(store.list_by_user(owner).await.unwrap().is_empty());
    }
}
