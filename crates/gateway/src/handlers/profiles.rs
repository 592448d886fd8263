//! Profile registration

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use agora_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    policy::Role,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterProfileRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Upsert the caller's profile with the role their email domain implies.
///
/// Tokens for unrecognised domains are refused here rather than treated as anonymous.
pub async fn register_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<RegisterProfileRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>)> {
    request.validate()?;

    let email = auth.email.as_deref().ok_or_else(|| AppError::Unauthorized {
        message: "Sign in required".to_string(),
    })?;
    let role = state.verifier.identity.validate_registration_email(email)?;
    let user_id = auth.require_user()?;

    let profile = state
        .repo()
        .upsert_profile(user_id, email, &request.full_name, role)
        .await?;

    tracing::info!(user_id = %user_id, role = %role, "Profile registered");

    Ok((
        StatusCode::OK,
        Json(ProfileResponse {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role,
        }),
    ))
}
