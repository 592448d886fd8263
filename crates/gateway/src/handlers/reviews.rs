//! Reviewer assignment and review handlers

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
    db::models::{NotificationKind, Profile, Recommendation, Review, ReviewAssignment},
    db::NewReview,
    errors::{AppError, Result},
    metrics::{self, Decision},
    policy::{
        can_view_assignments, can_view_reviews, check_assign_reviewer, check_complete_review,
        check_remove_assignment, PaperStatus, ReviewDenial,
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct AssignReviewersRequest {
    #[validate(length(min = 1, max = 10))]
    pub reviewer_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReviewRequest {
    #[validate(length(min = 1, max = 20000))]
    pub content: String,

    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,

    pub recommendation: Recommendation,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub paper_id: Uuid,
    /// Shown to staff only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<Uuid>,
    pub content: String,
    pub rating: Option<i32>,
    pub recommendation: String,
    pub created_at: String,
}

impl ReviewResponse {
    fn new(review: Review, show_reviewer: bool) -> Self {
        Self {
            id: review.id,
            paper_id: review.paper_id,
            reviewer_id: show_reviewer.then_some(review.reviewer_id),
            content: review.content,
            rating: review.rating,
            recommendation: review.recommendation,
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ReviewerCandidate {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub user_type: String,
}

impl From<Profile> for ReviewerCandidate {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            full_name: profile.full_name,
            email: profile.email,
            user_type: profile.user_type,
        }
    }
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub reviewer_id: Uuid,
    pub status: String,
    pub assigned_at: String,
    pub completed_at: Option<String>,
}

impl From<ReviewAssignment> for AssignmentResponse {
    fn from(assignment: ReviewAssignment) -> Self {
        Self {
            id: assignment.id,
            paper_id: assignment.paper_id,
            reviewer_id: assignment.reviewer_id,
            status: assignment.status,
            assigned_at: assignment.assigned_at.to_rfc3339(),
            completed_at: assignment.completed_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

async fn load_assignment(state: &AppState, id: Uuid) -> Result<ReviewAssignment> {
    state
        .repo()
        .find_assignment(id)
        .await?
        .ok_or_else(|| AppError::AssignmentNotFound { id: id.to_string() })
}

/// Staff view of who reviews a paper
pub async fn list_reviewers(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Vec<AssignmentResponse>>> {
    let allowed = can_view_assignments(&auth.principal);
    metrics::record_authorization("view_assignments", Decision::from_allowed(allowed));
    if !allowed {
        auth.require_user()?;
        return Err(AppError::Forbidden {
            message: "Reviewer assignments are visible to staff only".to_string(),
        });
    }

    let repo = state.repo();
    load_visible_paper(&repo, &auth.principal, paper_id).await?;
    let assignments = repo.assignments_for_paper(paper_id).await?;

    Ok(Json(assignments.into_iter().map(Into::into).collect()))
}

/// Attach reviewers; the first assignment on a submitted paper starts its review
pub async fn assign_reviewers(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<AssignReviewersRequest>,
) -> Result<(StatusCode, Json<Vec<AssignmentResponse>>)> {
    auth.require_user()?;
    request.validate()?;

    let mut reviewer_ids = request.reviewer_ids;
    reviewer_ids.sort();
    reviewer_ids.dedup();

    let repo = state.repo();
    let (record, _) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let mut starts_review = false;
    for reviewer_id in &reviewer_ids {
        let decision = check_assign_reviewer(&auth.principal, &record.snapshot, *reviewer_id);
        metrics::record_authorization("assign_reviewer", Decision::from_allowed(decision.is_ok()));
        starts_review |= decision?.starts_review;
    }

    let known = repo.find_profiles_by_ids(&reviewer_ids).await?;
    if let Some(missing) = reviewer_ids.iter().find(|id| !known.iter().any(|p| p.id == **id)) {
        return Err(AppError::Validation {
            message: format!("No registered user {}", missing),
            field: Some("reviewer_ids".to_string()),
        });
    }

    let created = repo.assign_reviewers(paper_id, &reviewer_ids, starts_review).await?;

    if starts_review {
        metrics::record_transition(PaperStatus::Submitted, PaperStatus::UnderReview);
    }
    notify(
        &repo,
        &reviewer_ids,
        NotificationKind::ReviewAssigned,
        paper_id,
        format!("You have been asked to review \"{}\"", record.paper.title),
    )
    .await;
    tracing::info!(
        paper_id = %paper_id,
        reviewers = created.len(),
        starts_review,
        "Reviewers assigned"
    );

    Ok((StatusCode::CREATED, Json(created.into_iter().map(Into::into).collect())))
}

/// Withdraw an open assignment
pub async fn remove_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(assignment_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_user()?;
    let assignment = load_assignment(&state, assignment_id).await?;

    let decision = check_remove_assignment(&auth.principal, &assignment.snapshot()?);
    metrics::record_authorization("remove_assignment", Decision::from_allowed(decision.is_ok()));
    decision?;

    state.repo().remove_assignment(assignment_id).await?;

    tracing::info!(assignment_id = %assignment_id, paper_id = %assignment.paper_id, "Assignment removed");
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own assignments, newest first
pub async fn my_assignments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AssignmentResponse>>> {
    let reviewer_id = auth.require_user()?;
    let assignments = state.repo().assignments_for_reviewer(reviewer_id).await?;

    Ok(Json(assignments.into_iter().map(Into::into).collect()))
}

/// The assigned reviewer marks their review done while the paper is under review
pub async fn complete_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>> {
    auth.require_user()?;
    let assignment = load_assignment(&state, assignment_id).await?.snapshot()?;

    let repo = state.repo();
    let record = repo
        .find_paper(assignment.paper_id)
        .await?
        .ok_or_else(|| AppError::PaperNotFound { id: assignment.paper_id.to_string() })?;

    let decision = check_complete_review(&auth.principal, &record.snapshot, &assignment);
    metrics::record_authorization("complete_review", Decision::from_allowed(decision.is_ok()));
    decision?;

    let completed = repo.complete_assignment(&assignment).await?;

    tracing::info!(assignment_id = %assignment_id, paper_id = %completed.paper_id, "Review completed");
    Ok(Json(completed.into()))
}

/// Store the caller's review and complete their assignment
pub async fn submit_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let reviewer_id = auth.require_user()?;
    request.validate()?;

    let repo = state.repo();
    let (record, assignments) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let assignment = assignments
        .iter()
        .find(|a| a.is_for(paper_id, reviewer_id))
        .copied()
        .ok_or(AppError::ReviewNotAllowed(ReviewDenial::NotAssignedReviewer));
    let decision = assignment.and_then(|a| {
        check_complete_review(&auth.principal, &record.snapshot, &a)?;
        Ok(a)
    });
    metrics::record_authorization("submit_review", Decision::from_allowed(decision.is_ok()));
    let assignment = decision?;

    let review = repo
        .submit_review(
            &assignment,
            NewReview {
                content: request.content,
                rating: request.rating,
                recommendation: request.recommendation,
            },
        )
        .await?;

    tracing::info!(
        paper_id = %paper_id,
        review_id = %review.id,
        recommendation = %review.recommendation,
        "Review submitted"
    );
    notify(
        &repo,
        &authors_except(&record.snapshot, Some(reviewer_id)),
        NotificationKind::ReviewSubmitted,
        paper_id,
        format!("A review was submitted for \"{}\"", record.paper.title),
    )
    .await;

    Ok((StatusCode::CREATED, Json(ReviewResponse::new(review, auth.principal.is_staff()))))
}

/// Submitted reviews, for staff and the paper's authors
pub async fn list_reviews(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>> {
    let repo = state.repo();
    let (record, _) = load_visible_paper(&repo, &auth.principal, paper_id).await?;

    let allowed = can_view_reviews(&auth.principal, &record.snapshot);
    metrics::record_authorization("view_reviews", Decision::from_allowed(allowed));
    if !allowed {
        auth.require_user()?;
        return Err(AppError::Forbidden {
            message: "Reviews are visible to staff and the paper's authors".to_string(),
        });
    }

    let show_reviewer = auth.principal.is_staff();
    let reviews = repo.list_reviews(paper_id).await?;
    Ok(Json(reviews.into_iter().map(|r| ReviewResponse::new(r, show_reviewer)).collect()))
}

/// Registered users who could review a paper: everyone but its authors
pub async fn potential_reviewers(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewerCandidate>>> {
    let allowed = can_view_assignments(&auth.principal);
    metrics::record_authorization("potential_reviewers", Decision::from_allowed(allowed));
    if !allowed {
        auth.require_user()?;
        return Err(AppError::Forbidden {
            message: "Reviewer candidates are visible to staff only".to_string(),
        });
    }

    let repo = state.repo();
    let (record, _) = load_visible_paper(&repo, &auth.principal, paper_id).await?;
    let candidates = repo.potential_reviewers(&record.snapshot.author_ids).await?;

    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}
