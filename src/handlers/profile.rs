use axum::{Json, extract::State};

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::UserProfile;
use crate::services::AuthService;
use crate::state::AppState;

/// プロフィール取得ハンドラー
///
/// GET /api/auth/profile
///
/// パスワードハッシュ・トークンは含めない
pub async fn profile(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = AuthService::new(state.user_repo.clone())
        .profile(user.id)
        .await?;
    Ok(Json(UserProfile::from(&user)))
}
