use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// 参照データ（ステージ）の件数。ストアに到達できない場合は None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<usize>,
}

/// GET /api/health
///
/// ストアからステージ一覧を読めれば 200、読めなければ 503
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.stage_repo.list().await {
        Ok(stages) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                stages: Some(stages.len()),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "ヘルスチェック: ストアに到達できません");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    version: env!("CARGO_PKG_VERSION"),
                    stages: None,
                }),
            )
        }
    }
}
