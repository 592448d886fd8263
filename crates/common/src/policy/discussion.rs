//! Feedback and comment rules
//!
//! Both assume the caller has already established that the paper itself
//! is visible, either through [`is_visible`] or a shared-link grant.

use serde::{Deserialize, Serialize};

use super::principal::{Principal, UserId};
use super::snapshot::{AssignmentSnapshot, PaperSnapshot};
use super::visibility::is_visible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    pub user_id: UserId,
    pub is_private: bool,
}

/// Any signed-in principal who can see the paper may post feedback or comments
pub fn can_post_discussion(
    principal: &Principal,
    paper: &PaperSnapshot,
    assignments: &[AssignmentSnapshot],
) -> bool {
    principal.is_authenticated() && is_visible(principal, paper, assignments)
}

/// Likes follow the posting rule
pub fn can_like(principal: &Principal, paper: &PaperSnapshot, assignments: &[AssignmentSnapshot]) -> bool {
    can_post_discussion(principal, paper, assignments)
}

/// Private feedback is for the paper's authors, its writer, and staff
pub fn can_view_feedback(principal: &Principal, paper: &PaperSnapshot, feedback: &FeedbackSnapshot) -> bool {
    if !feedback.is_private {
        return true;
    }
    principal.is_staff()
        || paper.is_authored_by(principal)
        || principal.user_id() == Some(feedback.user_id)
}

/// Keep only the feedback the principal may read, in order
pub fn visible_feedback<'a, T>(
    principal: &Principal,
    paper: &PaperSnapshot,
    items: &'a [T],
    snapshot: impl Fn(&T) -> FeedbackSnapshot,
) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| can_view_feedback(principal, paper, &snapshot(item)))
        .collect()
}

/// Comment writers and staff may delete a comment; guest comments are staff-only
pub fn can_delete_comment(principal: &Principal, writer: Option<UserId>) -> bool {
    principal.is_staff() || (writer.is_some() && principal.user_id() == writer)
}
