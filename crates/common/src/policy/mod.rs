//! Visibility and transition authority
//!
//! Pure decision functions shared by every surface that lists or mutates
//! papers. Nothing in this module performs I/O, caches, or blocks; callers
//! load fresh snapshots, ask, and then act. A failure to load the inputs is
//! a data-access error for the caller to surface, never a policy outcome.

pub mod discussion;
pub mod principal;
pub mod review;
pub mod shared_link;
pub mod snapshot;
pub mod status;
pub mod transition;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

pub use discussion::{
    can_delete_comment, can_like, can_post_discussion, can_view_feedback, visible_feedback, FeedbackSnapshot,
};
pub use principal::{Principal, Role, UserId};
pub use review::{
    can_assign_reviewer, can_complete_review, can_remove_assignment, can_view_assignments, can_view_reviews,
    check_assign_reviewer,
    check_complete_review, check_remove_assignment, AssignmentEffect, ReviewDenial,
};
pub use shared_link::{
    can_access_via_shared_link, can_manage_shared_links, evaluate_shared_link, Capabilities,
    Capability, LinkDenial, SharedLinkGrant, SharedLinkSnapshot,
};
pub use snapshot::{AssignmentSnapshot, PaperSnapshot};
pub use status::{AssignmentStatus, PaperStatus, UnknownStatus};
pub use transition::{allowed_transitions, can_transition, check_transition, TransitionDenial, TransitionRule};
pub use visibility::{is_visible, visibility_scope, visible_papers, VisibilityScope};
