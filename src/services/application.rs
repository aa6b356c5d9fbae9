use std::sync::Arc;

use garde::Validate;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Application, ApplicationChanges, NewApplication, Stage};
use crate::repositories::{ApplicationStore, StageStore};

/// 応募記録サービス
///
/// 全ての操作は所有ユーザーで絞り込む。他ユーザーの記録は存在しないものとして扱う。
#[derive(Clone)]
pub struct ApplicationService {
    application_repo: Arc<dyn ApplicationStore>,
    stage_repo: Arc<dyn StageStore>,
}

impl ApplicationService {
    pub fn new(application_repo: Arc<dyn ApplicationStore>, stage_repo: Arc<dyn StageStore>) -> Self {
        Self {
            application_repo,
            stage_repo,
        }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Application>, AppError> {
        self.application_repo.list_by_user(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, application_id: Uuid) -> Result<Application, AppError> {
        self.application_repo
            .find_for_user(application_id, user_id)
            .await?
            .ok_or(AppError::NotFound("Application"))
    }

    /// 応募記録を作成（ステージ未指定なら既定ステージ）
    pub async fn create(
        &self,
        user_id: Uuid,
        input: NewApplication,
    ) -> Result<Application, AppError> {
        let input = input.normalized();
        validate(&input)?;

        let stage = match input.stage {
            Some(stage_id) => self.find_stage(stage_id).await?,
            None => self
                .stage_repo
                .find_default()
                .await?
                .ok_or(AppError::NotFound("Stage"))?,
        };

        let application = self.application_repo.create(user_id, stage.id, &input).await?;
        tracing::info!(user_id = %user_id, application_id = %application.id, "応募記録作成");
        Ok(application)
    }

    /// 部分更新（後勝ち）
    pub async fn update(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        changes: ApplicationChanges,
    ) -> Result<Application, AppError> {
        let changes = changes.normalized();
        validate(&changes)?;

        if let Some(stage_id) = changes.stage {
            self.find_stage(stage_id).await?;
        }

        let application = self
            .application_repo
            .update_for_user(application_id, user_id, &changes)
            .await?
            .ok_or(AppError::NotFound("Application"))?;
        tracing::info!(user_id = %user_id, application_id = %application_id, "応募記録更新");
        Ok(application)
    }

    pub async fn delete(&self, user_id: Uuid, application_id: Uuid) -> Result<(), AppError> {
        if !self
            .application_repo
            .delete_for_user(application_id, user_id)
            .await?
        {
            return Err(AppError::NotFound("Application"));
        }
        tracing::info!(user_id = %user_id, application_id = %application_id, "応募記録削除");
        Ok(())
    }

    async fn find_stage(&self, stage_id: Uuid) -> Result<Stage, AppError> {
        self.stage_repo
            .find_by_id(stage_id)
            .await?
            .ok_or(AppError::NotFound("Stage"))
    }
}

fn validate<T: Validate<Context = ()>>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|report| AppError::Validation(report.to_string()))
}
