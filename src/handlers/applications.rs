use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use super::logout::MessageResponse;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::models::{Application, ApplicationChanges, NewApplication};
use crate::services::ApplicationService;
use crate::state::AppState;
use crate::views::{ApplicationsFilter, SortKey, Statistics, apply_filter, compute_statistics};

/// 一覧の絞り込みクエリ（リストはカンマ区切り）
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationsQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub stage: Option<String>,
    pub rank: Option<String>,
    pub sort: Option<String>,
}

impl ApplicationsQuery {
    /// 絞り込み条件に変換
    pub fn into_filter(self) -> Result<ApplicationsFilter, AppError> {
        let stage = split_list(self.stage.as_deref())
            .map(|id| {
                id.parse::<Uuid>()
                    .map_err(|_| AppError::Validation(format!("Invalid stage id: {id}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let rank = split_list(self.rank.as_deref())
            .map(|rank| {
                rank.parse::<i32>()
                    .map_err(|_| AppError::Validation(format!("Invalid rank: {rank}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let sort = self
            .sort
            .as_deref()
            .map(str::parse::<SortKey>)
            .transpose()
            .map_err(AppError::Validation)?
            .unwrap_or_default();

        Ok(ApplicationsFilter {
            search: self.search.unwrap_or_default().trim().to_string(),
            location: split_list(self.location.as_deref()).map(str::to_string).collect(),
            stage,
            rank,
            sort,
        })
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn application_service(state: &AppState) -> ApplicationService {
    ApplicationService::new(state.application_repo.clone(), state.stage_repo.clone())
}

/// GET /api/applications
pub async fn list_applications(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Query(query): Query<ApplicationsQuery>,
) -> Result<Json<Vec<Application>>, AppError> {
    let filter = query.into_filter()?;
    let applications = application_service(&state).list(user.id).await?;

    Ok(Json(apply_filter(&filter, &applications)))
}

/// GET /api/applications/statistics
pub async fn application_statistics(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> Result<Json<Statistics>, AppError> {
    let applications = application_service(&state).list(user.id).await?;
    Ok(Json(compute_statistics(&applications)))
}

/// GET /api/applications/{id}
pub async fn get_application(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Application>, AppError> {
    let application = application_service(&state).get(user.id, id).await?;
    Ok(Json(application))
}

/// POST /api/applications
pub async fn create_application(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    ApiJson(input): ApiJson<NewApplication>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = application_service(&state).create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// PUT /api/applications/{id}
pub async fn update_application(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<ApplicationChanges>,
) -> Result<Json<Application>, AppError> {
    let application = application_service(&state)
        .update(user.id, id, changes)
        .await?;
    Ok(Json(application))
}

/// DELETE /api/applications/{id}
pub async fn delete_application(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    application_service(&state).delete(user.id, id).await?;
    Ok(Json(MessageResponse::new("Application deleted successfully.")))
}
