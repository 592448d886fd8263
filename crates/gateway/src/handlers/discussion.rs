//! Feedback and comment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{authors_except, load_visible_paper, notify};
use crate::AppState;
use agora_common::{
    auth::AuthContext,
    db::{
        models::{Comment, Feedback, NotificationKind},
        NewComment,
    },
    errors::{AppError, Result},
    metrics::{self, Decision},
    policy::{can_delete_comment, can_post_discussion, visible_feedback},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedbackRequest {
    #[validate(length(min = 1, max = 20000))]
    pub content: String,

    /// Private feedback reaches only the authors and staff
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_private: bool,
    pub created_at: String,
}

impl From<&Feedback> for FeedbackResponse {
    fn from(feedback: &Feedback) -> Self {
        Self {
            id: feedback.id,
            paper_id: feedback.paper_id,
            user_id: feedback.user_id,
            content: feedback.content.clone(),
            is_private: feedback.is_private,
            created_at: feedback.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            paper_id: comment.paper_id,
            user_id: comment.user_id,
            guest_name: comment.guest_name,
            content: comment.content,
            created_at: comment.created_at.to_rfc3339(),
        }
    }
}

pub async fn list_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Vec<FeedbackResponse>>> {
    let repo = state.repo();
    let (record, _) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let items = repo.list_feedback(paper_id).await?;
    let visible = visible_feedback(&auth.principal, &record.snapshot, &items, Feedback::snapshot);

    Ok(Json(visible.into_iter().map(Into::into).collect()))
}

pub async fn create_feedback(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>)> {
    let user_id = auth.require_user()?;
    request.validate()?;

    let repo = state.repo();
    let (record, assignments) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let allowed = can_post_discussion(&auth.principal, &record.snapshot, &assignments);
    metrics::record_authorization("post_feedback", Decision::from_allowed(allowed));
    if !allowed {
        return Err(AppError::Forbidden {
            message: "Cannot post feedback on this paper".to_string(),
        });
    }

    let feedback = repo
        .create_feedback(paper_id, user_id, request.content, request.is_private)
        .await?;

    tracing::info!(paper_id = %paper_id, feedback_id = %feedback.id, is_private = feedback.is_private, "Feedback posted");
    notify(
        &repo,
        &authors_except(&record.snapshot, Some(user_id)),
        NotificationKind::Feedback,
        paper_id,
        format!("New feedback on \"{}\"", record.paper.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json((&feedback).into())))
}

pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>> {
    let repo = state.repo();
    load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let comments = repo.list_comments(paper_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let user_id = auth.require_user()?;
    request.validate()?;

    let repo = state.repo();
    let (record, assignments) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let allowed = can_post_discussion(&auth.principal, &record.snapshot, &assignments);
    metrics::record_authorization("post_comment", Decision::from_allowed(allowed));
    if !allowed {
        return Err(AppError::Forbidden {
            message: "Cannot comment on this paper".to_string(),
        });
    }

    let comment = repo
        .create_comment(NewComment {
            paper_id,
            user_id: Some(user_id),
            guest_name: None,
            shared_link_id: None,
            content: request.content,
        })
        .await?;

    notify(
        &repo,
        &authors_except(&record.snapshot, Some(user_id)),
        NotificationKind::Comment,
        paper_id,
        format!("New comment on \"{}\"", record.paper.title),
    )
    .await;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_user()?;

    let repo = state.repo();
    let comment = repo.find_comment(comment_id).await?.ok_or_else(|| AppError::NotFound {
        resource_type: "comment".to_string(),
        id: comment_id.to_string(),
    })?;

    let allowed = can_delete_comment(&auth.principal, comment.user_id);
    metrics::record_authorization("delete_comment", Decision::from_allowed(allowed));
    if !allowed {
        return Err(AppError::Forbidden {
            message: "Only the writer or staff may delete this comment".to_string(),
        });
    }

    repo.delete_comment(comment_id).await?;

    tracing::info!(comment_id = %comment_id, paper_id = %comment.paper_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_defaults_public() {
        let request: CreateFeedbackRequest = serde_json::from_str(r#"{"content":"Clear methods."}"#).unwrap();
        assert!(!request.is_private);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_comment_rejected() {
        let request = CreateCommentRequest { content: String::new() };
        assert!(request.validate().is_err());
    }
}
