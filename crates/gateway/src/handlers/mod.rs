//! API handlers module

pub mod categories;
pub mod discussion;
pub mod engagement;
pub mod health;
pub mod notifications;
pub mod papers;
pub mod profiles;
pub mod reviews;
pub mod shared_links;

use agora_common::{
    db::{models::NotificationKind, PaperRecord, Repository},
    errors::{AppError, Result},
    metrics::{self, Decision},
    policy::{is_visible, AssignmentSnapshot, PaperSnapshot, Principal, UserId},
};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// `limit` / `offset` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

/// Load a paper and the assignments that decide who may see it.
///
/// A paper the principal cannot see is reported exactly like a missing one.
pub(crate) async fn load_visible_paper(
    repo: &Repository,
    principal: &Principal,
    paper_id: Uuid,
) -> Result<(PaperRecord, Vec<AssignmentSnapshot>)> {
    let record = repo
        .find_paper(paper_id)
        .await?
        .ok_or_else(|| AppError::PaperNotFound { id: paper_id.to_string() })?;
    let assignments = repo.assignment_snapshots_for_paper(paper_id).await?;

    let visible = is_visible(principal, &record.snapshot, &assignments);
    metrics::record_authorization("view_paper", Decision::from_allowed(visible));
    if !visible {
        tracing::debug!(paper_id = %paper_id, principal = principal.kind(), "Paper hidden from principal");
        return Err(AppError::PaperNotFound { id: paper_id.to_string() });
    }

    Ok((record, assignments))
}

/// A paper's authors other than the one who acted
pub(crate) fn authors_except(paper: &PaperSnapshot, actor: Option<UserId>) -> Vec<UserId> {
    paper
        .author_ids
        .iter()
        .copied()
        .filter(|id| Some(*id) != actor)
        .collect()
}

/// Store notifications once the main write has succeeded.
///
/// Delivery is best effort: a failure is logged and the request still succeeds.
pub(crate) async fn notify(
    repo: &Repository,
    recipients: &[UserId],
    kind: NotificationKind,
    paper_id: Uuid,
    message: String,
) {
    if let Err(e) = repo.notify(recipients, kind, Some(paper_id), &message).await {
        tracing::warn!(paper_id = %paper_id, kind = kind.as_str(), error = %e, "Failed to store notifications");
    }
}
