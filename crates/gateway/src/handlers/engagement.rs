//! Likes and the trending listing

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{authors_except, load_visible_paper, notify, papers::PaperSummary};
use crate::AppState;
use agora_common::{
    auth::AuthContext,
    db::{models::NotificationKind, TrendingFilter},
    errors::{AppError, Result},
    metrics::{self, Decision},
    policy::can_like,
};

const DEFAULT_TRENDING_DAYS: i64 = 7;
const MAX_TRENDING_DAYS: i64 = 365;
const DEFAULT_TRENDING_LIMIT: u64 = 10;
const MAX_TRENDING_LIMIT: u64 = 50;

#[derive(Serialize)]
pub struct LikeSummary {
    pub paper_id: Uuid,
    pub like_count: u64,
    /// Whether the caller likes the paper; false for anonymous callers
    pub liked: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    pub category_id: Option<Uuid>,
    /// Window in days over which likes count
    pub days: Option<i64>,
    pub limit: Option<u64>,
}

impl TrendingQuery {
    fn days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_TRENDING_DAYS).clamp(1, MAX_TRENDING_DAYS)
    }

    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_TRENDING_LIMIT).clamp(1, MAX_TRENDING_LIMIT)
    }
}

#[derive(Serialize)]
pub struct TrendingPaper {
    #[serde(flatten)]
    pub paper: PaperSummary,
    pub like_count: i64,
}

async fn summary(state: &AppState, paper_id: Uuid, user_id: Option<Uuid>) -> Result<LikeSummary> {
    let repo = state.repo();
    let like_count = repo.like_count(paper_id).await?;
    let liked = match user_id {
        Some(user_id) => repo.has_liked(paper_id, user_id).await?,
        None => false,
    };
    Ok(LikeSummary { paper_id, like_count, liked })
}

/// Like count of a paper the caller can see
pub async fn get_likes(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<LikeSummary>> {
    load_visible_paper(&state.repo(), &auth.principal, paper_id).await?;
    Ok(Json(summary(&state, paper_id, auth.principal.user_id()).await?))
}

pub async fn like_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<LikeSummary>> {
    let user_id = auth.require_user()?;
    let repo = state.repo();
    let (record, assignments) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let allowed = can_like(&auth.principal, &record.snapshot, &assignments);
    metrics::record_authorization("like_paper", Decision::from_allowed(allowed));
    if !allowed {
        return Err(AppError::Forbidden {
            message: "Cannot like this paper".to_string(),
        });
    }

    if repo.like_paper(paper_id, user_id).await? {
        tracing::debug!(paper_id = %paper_id, user_id = %user_id, "Paper liked");
        notify(
            &repo,
            &authors_except(&record.snapshot, Some(user_id)),
            NotificationKind::Like,
            paper_id,
            format!("Someone liked \"{}\"", record.paper.title),
        )
        .await;
    }

    Ok(Json(summary(&state, paper_id, Some(user_id)).await?))
}

pub async fn unlike_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<LikeSummary>> {
    let user_id = auth.require_user()?;
    let repo = state.repo();
    load_visible_paper(&repo, &auth.principal, paper_id).await?;

    repo.unlike_paper(paper_id, user_id).await?;
    Ok(Json(summary(&state, paper_id, Some(user_id)).await?))
}

/// Published papers ranked by recent likes
pub async fn trending_papers(
    State(state): State<AppState>,
    Query(params): Query<TrendingQuery>,
) -> Result<Json<Vec<TrendingPaper>>> {
    let filter = TrendingFilter {
        since: Utc::now() - Duration::days(params.days()),
        category_id: params.category_id,
        limit: params.limit(),
    };

    let trending = state.repo().trending_papers(&filter).await?;
    Ok(Json(
        trending
            .iter()
            .map(|(record, like_count)| TrendingPaper {
                paper: record.into(),
                like_count: *like_count,
            })
            .collect(),
    ))
}
