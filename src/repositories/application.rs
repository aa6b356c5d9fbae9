use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::ApplicationStore;
use crate::error::AppError;
use crate::models::{Application, ApplicationChanges, NewApplication, Stage, StageType};
use crate::models::application::DEFAULT_RANK;

/// applications と stages の結合行
#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    user_id: Uuid,
    company: String,
    role: String,
    url: String,
    location: String,
    salary: Option<String>,
    rank: i32,
    comments: Option<String>,
    date_created: OffsetDateTime,
    date_modified: OffsetDateTime,
    date_applied: Option<OffsetDateTime>,
    stage_id: Uuid,
    stage_name: String,
    #[sqlx(try_from = "String")]
    stage_type: StageType,
    stage_number: i32,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            stage: Stage {
                id: row.stage_id,
                name: row.stage_name,
                stage_type: row.stage_type,
                number: row.stage_number,
            },
            company: row.company,
            role: row.role,
            url: row.url,
            location: row.location,
            salary: row.salary,
            rank: row.rank,
            comments: row.comments,
            date_created: row.date_created,
            date_modified: row.date_modified,
            date_applied: row.date_applied,
        }
    }
}

const SELECT_APPLICATION: &str = r#"
    SELECT a.id, a.user_id, a.company, a.role, a.url, a.location, a.salary, a.rank,
           a.comments, a.date_created, a.date_modified, a.date_applied,
           s.id AS stage_id, s.name AS stage_name, s.stage_type, s.number AS stage_number
    FROM applications a
    JOIN stages s ON s.id = a.stage_id
"#;

#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_owned(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "{SELECT_APPLICATION} WHERE a.id = $1 AND a.user_id = $2"
        ))
        .bind(application_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Application::from))
    }
}

#[async_trait]
impl ApplicationStore for ApplicationRepository {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Application>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "{SELECT_APPLICATION} WHERE a.user_id = $1 ORDER BY a.date_created ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Application::from).collect())
    }

    async fn find_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Application>, AppError> {
        self.fetch_owned(application_id, user_id).await
    }

    async fn create(
        &self,
        user_id: Uuid,
        stage_id: Uuid,
        application: &NewApplication,
    ) -> Result<Application, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO applications
                (user_id, stage_id, company, role, url, location, salary, rank, comments, date_applied)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(stage_id)
        .bind(&application.company)
        .bind(&application.role)
        .bind(&application.url)
        .bind(&application.location)
        .bind(&application.salary)
        .bind(application.rank.unwrap_or(DEFAULT_RANK))
        .bind(&application.comments)
        .bind(application.date_applied)
        .fetch_one(&self.pool)
        .await?;

        self.fetch_owned(id, user_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("inserted application disappeared"))
        })
    }

    /// 単一の UPDATE で部分更新（後勝ち、楽観ロックなし）
    async fn update_for_user(
        &self,
        application_id: Uuid,
        user_id: Uuid,
        changes: &ApplicationChanges,
    ) -> Result<Option<Application>, AppError> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE applications
            SET company = COALESCE($3, company),
                role = COALESCE($4, role),
                url = COALESCE($5, url),
                location = COALESCE($6, location),
                salary = COALESCE($7, salary),
                stage_id = COALESCE($8, stage_id),
                rank = COALESCE($9, rank),
                comments = COALESCE($10, comments),
                date_applied = COALESCE($11, date_applied),
                date_modified = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(application_id)
        .bind(user_id)
        .bind(&changes.company)
        .bind(&changes.role)
        .bind(&changes.url)
        .bind(&changes.location)
        .bind(&changes.salary)
        .bind(changes.stage)
        .bind(changes.rank)
        .bind(&changes.comments)
        .bind(changes.date_applied)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.fetch_owned(id, user_id).await,
            None => Ok(None),
        }
    }

    async fn delete_for_user(&self, application_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM applications
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(application_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
