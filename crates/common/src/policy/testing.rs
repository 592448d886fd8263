//! Builders for policy tests

use uuid::Uuid;

use super::principal::UserId;
use super::shared_link::SharedLinkSnapshot;
use super::snapshot::{AssignmentSnapshot, PaperSnapshot};
use super::status::{AssignmentStatus, PaperStatus};

pub fn paper(status: PaperStatus, authors: &[UserId]) -> PaperSnapshot {
    PaperSnapshot {
        id: Uuid::new_v4(),
        status,
        category_id: Uuid::new_v4(),
        author_ids: authors.to_vec(),
    }
}

pub fn assignment(paper: &PaperSnapshot, reviewer: UserId, status: AssignmentStatus) -> AssignmentSnapshot {
    AssignmentSnapshot {
        id: Uuid::new_v4(),
        paper_id: paper.id,
        reviewer_id: reviewer,
        status,
    }
}

/// Active, never-expiring, download only
pub fn shared_link(paper_id: Uuid) -> SharedLinkSnapshot {
    SharedLinkSnapshot {
        id: Uuid::new_v4(),
        paper_id,
        is_active: true,
        expires_at: None,
        allow_comments: false,
        allow_download: true,
    }
}
