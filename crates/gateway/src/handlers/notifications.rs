//! The caller's stored notifications

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use agora_common::{
    auth::AuthContext,
    db::models::Notification,
    errors::{AppError, Result},
};

const DEFAULT_NOTIFICATION_LIMIT: u64 = 20;
const MAX_NOTIFICATION_LIMIT: u64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub kind: String,
    pub related_id: Option<Uuid>,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            related_id: notification.related_id,
            message: notification.message,
            is_read: notification.is_read,
            created_at: notification.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct MarkedResponse {
    pub marked: u64,
}

/// Newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationResponse>>> {
    let user_id = auth.require_user()?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
        .clamp(1, MAX_NOTIFICATION_LIMIT);

    let rows = state.repo().list_notifications(user_id, params.unread, limit).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Another user's notification answers like a missing one
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode> {
    let user_id = auth.require_user()?;

    if !state.repo().mark_notification_read(notification_id, user_id).await? {
        return Err(AppError::NotFound {
            resource_type: "notification".to_string(),
            id: notification_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(State(state): State<AppState>, auth: AuthContext) -> Result<Json<MarkedResponse>> {
    let user_id = auth.require_user()?;
    let marked = state.repo().mark_all_notifications_read(user_id).await?;

    tracing::debug!(user_id = %user_id, marked, "Notifications marked read");
    Ok(Json(MarkedResponse { marked }))
}
