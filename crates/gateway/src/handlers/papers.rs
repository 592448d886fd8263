//! Paper workflow handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use super::{authors_except, load_visible_paper, notify, Pagination};
use crate::AppState;
use agora_common::{
    auth::AuthContext,
    db::{models::NotificationKind, NewPaper, PaperFilter, PaperRecord},
    errors::{AppError, Result},
    metrics::{self, Decision},
    policy::{
        allowed_transitions, check_transition, visibility_scope, visible_papers, AssignmentSnapshot,
        PaperSnapshot, PaperStatus, Principal,
    },
};

/// Request to create a new draft
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,

    #[validate(length(min = 1, max = 20000))]
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub category_id: Uuid,

    #[validate(length(min = 1, max = 2048))]
    pub pdf_url: Option<String>,

    /// Registered emails of the other authors, in byline order
    #[serde(default)]
    #[validate(length(max = 20))]
    pub co_author_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target: PaperStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPapersQuery {
    pub category_id: Option<Uuid>,
    pub q: Option<String>,
    /// Only papers the caller authored
    #[serde(default)]
    pub mine: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListPapersQuery {
    fn page(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Serialize)]
pub struct PaperSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub category_id: Uuid,
    pub status: PaperStatus,
    pub author_ids: Vec<Uuid>,
    pub created_at: String,
}

impl From<&PaperRecord> for PaperSummary {
    fn from(record: &PaperRecord) -> Self {
        Self {
            id: record.paper.id,
            title: record.paper.title.clone(),
            abstract_text: record.paper.abstract_text.clone(),
            category_id: record.paper.category_id,
            status: record.snapshot.status,
            author_ids: record.snapshot.author_ids.clone(),
            created_at: record.paper.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct AuthorResponse {
    pub author_id: Uuid,
    pub is_corresponding: bool,
    pub author_order: i32,
}

#[derive(Serialize)]
pub struct PaperDetail {
    #[serde(flatten)]
    pub summary: PaperSummary,
    pub pdf_url: Option<String>,
    pub resubmitted_from: Option<Uuid>,
    pub authors: Vec<AuthorResponse>,
    pub updated_at: String,
    /// Targets the caller could move this paper to right now
    pub allowed_transitions: Vec<PaperStatus>,
}

#[derive(Serialize)]
pub struct PaperListResponse {
    pub papers: Vec<PaperSummary>,
    pub limit: u64,
    pub offset: u64,
}

/// Transitions the caller could request, minus `under_review` while no reviewer is attached
fn transitions_for(
    principal: &Principal,
    snapshot: &PaperSnapshot,
    assignments: &[AssignmentSnapshot],
) -> Vec<PaperStatus> {
    allowed_transitions(principal, snapshot)
        .into_iter()
        .filter(|target| *target != PaperStatus::UnderReview || !assignments.is_empty())
        .collect()
}

fn detail(record: &PaperRecord, principal: &Principal, assignments: &[AssignmentSnapshot]) -> PaperDetail {
    PaperDetail {
        summary: record.into(),
        pdf_url: record.paper.pdf_url.clone(),
        resubmitted_from: record.paper.resubmitted_from,
        authors: record
            .authors
            .iter()
            .map(|a| AuthorResponse {
                author_id: a.author_id,
                is_corresponding: a.is_corresponding,
                author_order: a.author_order,
            })
            .collect(),
        updated_at: record.paper.updated_at.to_rfc3339(),
        allowed_transitions: transitions_for(principal, &record.snapshot, assignments),
    }
}

/// List the papers the caller may see, newest first
pub async fn list_papers(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListPapersQuery>,
) -> Result<Json<PaperListResponse>> {
    let author_id = if params.mine { Some(auth.require_user()?) } else { None };

    let page = params.page();
    let filter = PaperFilter {
        category_id: params.category_id,
        query: params.q.clone(),
        author_id,
        limit: page.limit(),
        offset: page.offset(),
    };

    let repo = state.repo();
    let records = repo.list_papers(visibility_scope(&auth.principal), &filter).await?;

    // The store already applied the scope; the authority has the final word
    let assignments = match auth.principal.user_id() {
        Some(user_id) if !auth.principal.is_staff() => repo.assignment_snapshots_for_reviewer(user_id).await?,
        _ => Vec::new(),
    };
    let snapshots: Vec<PaperSnapshot> = records.iter().map(|r| r.snapshot.clone()).collect();
    let visible: HashSet<Uuid> = visible_papers(&auth.principal, &snapshots, &assignments)
        .into_iter()
        .map(|p| p.id)
        .collect();

    let papers: Vec<PaperSummary> = records
        .iter()
        .filter(|r| visible.contains(&r.paper.id))
        .map(Into::into)
        .collect();

    if papers.len() != records.len() {
        tracing::warn!(
            fetched = records.len(),
            visible = papers.len(),
            "Listing returned rows outside the principal's visibility"
        );
    }

    Ok(Json(PaperListResponse {
        papers,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// Create a draft with the caller as corresponding author
pub async fn create_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreatePaperRequest>,
) -> Result<(StatusCode, Json<PaperDetail>)> {
    let creator_id = auth.require_user()?;
    request.validate()?;

    let record = state
        .repo()
        .create_paper(
            creator_id,
            NewPaper {
                title: request.title.trim().to_string(),
                abstract_text: request.abstract_text,
                category_id: request.category_id,
                pdf_url: request.pdf_url,
                co_author_emails: request.co_author_emails,
            },
        )
        .await?;

    tracing::info!(
        paper_id = %record.paper.id,
        creator_id = %creator_id,
        authors = record.authors.len(),
        "Paper draft created"
    );

    Ok((StatusCode::CREATED, Json(detail(&record, &auth.principal, &[]))))
}

/// Get a paper by ID
pub async fn get_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<PaperDetail>> {
    let repo = state.repo();
    let (record, assignments) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    Ok(Json(detail(&record, &auth.principal, &assignments)))
}

/// Request a status transition.
///
/// `rejected -> draft` answers 201 with the new draft; every other
/// transition answers 200 with the updated paper.
pub async fn transition_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<(StatusCode, Json<PaperDetail>)> {
    let repo = state.repo();
    let (record, assignments) = load_visible_paper(&repo, &auth.principal, paper_id).await?;
    let from = record.snapshot.status;
    let target = request.target;

    let decision = check_transition(&auth.principal, &record.snapshot, target);
    metrics::record_authorization("transition", Decision::from_allowed(decision.is_ok()));
    if let Err(denial) = decision {
        tracing::info!(
            paper_id = %paper_id,
            principal = auth.principal.kind(),
            from = %from,
            to = %target,
            reason = %denial,
            "Transition refused"
        );
        return Err(denial.into());
    }

    if target == PaperStatus::UnderReview && assignments.is_empty() {
        return Err(AppError::Validation {
            message: "Assign a reviewer before starting review".to_string(),
            field: Some("target".to_string()),
        });
    }

    let (code, updated) = if from == PaperStatus::Rejected && target == PaperStatus::Draft {
        (StatusCode::CREATED, repo.resubmit_rejected(&record).await?)
    } else {
        repo.update_status_if(paper_id, from, target).await?;
        let updated = repo
            .find_paper(paper_id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound { id: paper_id.to_string() })?;
        (StatusCode::OK, updated)
    };

    metrics::record_transition(from, target);
    tracing::info!(
        paper_id = %paper_id,
        result_id = %updated.paper.id,
        from = %from,
        to = %target,
        "Paper status changed"
    );
    notify(
        &repo,
        &authors_except(&updated.snapshot, auth.principal.user_id()),
        NotificationKind::PaperStatus,
        updated.paper.id,
        format!("\"{}\" moved from {} to {}", record.paper.title, from, target),
    )
    .await;

    Ok((code, Json(detail(&updated, &auth.principal, &assignments))))
}
