use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::StageStore;
use crate::error::AppError;
use crate::models::{NewStage, Stage};

#[derive(Clone)]
pub struct StageRepository {
    pool: PgPool,
}

impl StageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StageStore for StageRepository {
    async fn list(&self) -> Result<Vec<Stage>, AppError> {
        let stages = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, name, stage_type, number
            FROM stages
            ORDER BY number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stages)
    }

    async fn find_by_id(&self, stage_id: Uuid) -> Result<Option<Stage>, AppError> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, name, stage_type, number
            FROM stages
            WHERE id = $1
            "#,
        )
        .bind(stage_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stage)
    }

    async fn find_default(&self) -> Result<Option<Stage>, AppError> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT id, name, stage_type, number
            FROM stages
            ORDER BY number ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(stage)
    }

    /// 初期ステージ投入
    ///
    /// 1件でも存在する場合は何もしない（管理者が編集済みの参照データを上書きしない）
    async fn seed(&self, stages: &[NewStage]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stages")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        for stage in stages {
            sqlx::query(
                r#"
                INSERT INTO stages (name, stage_type, number)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(stage.name)
            .bind(stage.stage_type.as_str())
            .bind(stage.number)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(stages.len() as u64)
    }
}
