use axum::{Json, extract::State};

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::Stage;
use crate::state::AppState;

/// GET /api/stages
///
/// `number` 昇順の参照データ
pub async fn list_stages(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Stage>>, AppError> {
    Ok(Json(state.stage_repo.list().await?))
}
