//! Which papers a principal may see
//!
//! One rule, used by every listing and detail surface:
//! - anonymous: published papers only
//! - staff: everything
//! - any other authenticated user: published papers, plus papers they
//!   author (any status), plus papers they are assigned to review

use serde::{Deserialize, Serialize};

use super::principal::{Principal, Role, UserId};
use super::snapshot::{AssignmentSnapshot, PaperSnapshot};
use super::status::PaperStatus;

/// The visibility rule as a predicate the data store can evaluate.
///
/// Pushed down by the repository so listings do not fetch every row;
/// fetched rows are still passed through [`visible_papers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum VisibilityScope {
    All,
    PublishedOnly,
    PublishedOrMember { user_id: UserId },
}

/// Translate a principal into the predicate the store should apply
pub fn visibility_scope(principal: &Principal) -> VisibilityScope {
    match principal {
        Principal::Anonymous => VisibilityScope::PublishedOnly,
        Principal::User { role: Role::Staff, .. } => VisibilityScope::All,
        Principal::User { id, role: Role::Student } => {
            VisibilityScope::PublishedOrMember { user_id: *id }
        }
    }
}

fn is_assigned_reviewer(paper: &PaperSnapshot, user_id: UserId, assignments: &[AssignmentSnapshot]) -> bool {
    assignments.iter().any(|a| a.is_for(paper.id, user_id))
}

/// Whether a single paper is visible to the principal
pub fn is_visible(
    principal: &Principal,
    paper: &PaperSnapshot,
    assignments: &[AssignmentSnapshot],
) -> bool {
    match visibility_scope(principal) {
        VisibilityScope::All => true,
        VisibilityScope::PublishedOnly => paper.status == PaperStatus::Published,
        VisibilityScope::PublishedOrMember { user_id } => {
            paper.status == PaperStatus::Published
                || paper.is_author(user_id)
                || is_assigned_reviewer(paper, user_id, assignments)
        }
    }
}

/// Filter a candidate set down to what the principal may see.
///
/// Input order is preserved.
pub fn visible_papers<'a>(
    principal: &Principal,
    papers: &'a [PaperSnapshot],
    assignments: &[AssignmentSnapshot],
) -> Vec<&'a PaperSnapshot> {
    papers
        .iter()
        .filter(|paper| is_visible(principal, paper, assignments))
        .collect()
}
