//! Point-in-time views of persisted rows that policy decisions read
//!
//! Callers load these fresh for each decision; nothing here is cached.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::{Principal, UserId};
use super::status::{AssignmentStatus, PaperStatus};

/// The fields of a paper that authorization depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSnapshot {
    pub id: Uuid,
    pub status: PaperStatus,
    pub category_id: Uuid,
    /// Ordered by author position; the first entry is the corresponding author
    pub author_ids: Vec<UserId>,
}

impl PaperSnapshot {
    pub fn is_author(&self, user_id: UserId) -> bool {
        self.author_ids.contains(&user_id)
    }

    /// True when the principal is an authenticated author of this paper
    pub fn is_authored_by(&self, principal: &Principal) -> bool {
        principal.user_id().is_some_and(|id| self.is_author(id))
    }

    pub fn corresponding_author(&self) -> Option<UserId> {
        self.author_ids.first().copied()
    }
}

/// A reviewer's assignment to one paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub reviewer_id: UserId,
    pub status: AssignmentStatus,
}

impl AssignmentSnapshot {
    pub fn is_for(&self, paper_id: Uuid, reviewer_id: UserId) -> bool {
        self.paper_id == paper_id && self.reviewer_id == reviewer_id
    }
}
