//! Reviewer assignment rules

use serde::Serialize;
use std::fmt;

use super::principal::{Principal, UserId};
use super::snapshot::{AssignmentSnapshot, PaperSnapshot};
use super::status::{AssignmentStatus, PaperStatus};
use super::transition::{check_transition, TransitionDenial};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDenial {
    RequiresStaff,
    /// Reviewers are attached while a paper is submitted or under review,
    /// and reviews are only accepted while it is under review
    PaperNotReviewable(PaperStatus),
    ReviewerIsAuthor,
    NotAssignedReviewer,
    AlreadyCompleted,
    Transition(TransitionDenial),
}

impl fmt::Display for ReviewDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewDenial::RequiresStaff => f.write_str("only staff may manage reviewers"),
            ReviewDenial::PaperNotReviewable(status) => {
                write!(f, "reviewing is closed for a {} paper", status)
            }
            ReviewDenial::ReviewerIsAuthor => f.write_str("authors cannot review their own paper"),
            ReviewDenial::NotAssignedReviewer => f.write_str("not the assigned reviewer"),
            ReviewDenial::AlreadyCompleted => f.write_str("review assignment already completed"),
            ReviewDenial::Transition(denial) => denial.fmt(f),
        }
    }
}

/// What an allowed assignment does to the paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignmentEffect {
    /// The first assignment on a submitted paper moves it to under_review
    pub starts_review: bool,
}

pub fn check_assign_reviewer(
    principal: &Principal,
    paper: &PaperSnapshot,
    reviewer_id: UserId,
) -> Result<AssignmentEffect, ReviewDenial> {
    if !principal.is_staff() {
        return Err(ReviewDenial::RequiresStaff);
    }
    if paper.is_author(reviewer_id) {
        return Err(ReviewDenial::ReviewerIsAuthor);
    }

    match paper.status {
        PaperStatus::Submitted => {
            check_transition(principal, paper, PaperStatus::UnderReview).map_err(ReviewDenial::Transition)?;
            Ok(AssignmentEffect { starts_review: true })
        }
        PaperStatus::UnderReview => Ok(AssignmentEffect { starts_review: false }),
        other => Err(ReviewDenial::PaperNotReviewable(other)),
    }
}

pub fn can_assign_reviewer(principal: &Principal, paper: &PaperSnapshot, reviewer_id: UserId) -> bool {
    check_assign_reviewer(principal, paper, reviewer_id).is_ok()
}

/// Only the assigned reviewer, only once, and only while the paper is under review
pub fn check_complete_review(
    principal: &Principal,
    paper: &PaperSnapshot,
    assignment: &AssignmentSnapshot,
) -> Result<(), ReviewDenial> {
    if principal.user_id() != Some(assignment.reviewer_id) || assignment.paper_id != paper.id {
        return Err(ReviewDenial::NotAssignedReviewer);
    }
    if assignment.status == AssignmentStatus::Completed {
        return Err(ReviewDenial::AlreadyCompleted);
    }
    if paper.status != PaperStatus::UnderReview {
        return Err(ReviewDenial::PaperNotReviewable(paper.status));
    }
    Ok(())
}

pub fn can_complete_review(principal: &Principal, paper: &PaperSnapshot, assignment: &AssignmentSnapshot) -> bool {
    check_complete_review(principal, paper, assignment).is_ok()
}

/// Staff may withdraw an assignment that has not been completed
pub fn check_remove_assignment(principal: &Principal, assignment: &AssignmentSnapshot) -> Result<(), ReviewDenial> {
    if !principal.is_staff() {
        return Err(ReviewDenial::RequiresStaff);
    }
    if assignment.status == AssignmentStatus::Completed {
        return Err(ReviewDenial::AlreadyCompleted);
    }
    Ok(())
}

pub fn can_remove_assignment(principal: &Principal, assignment: &AssignmentSnapshot) -> bool {
    check_remove_assignment(principal, assignment).is_ok()
}

/// Reviewer identities stay hidden from authors; reviewers list their own rows elsewhere
pub fn can_view_assignments(principal: &Principal) -> bool {
    principal.is_staff()
}

/// Submitted reviews are read by staff and by the paper's authors
pub fn can_view_reviews(principal: &Principal, paper: &PaperSnapshot) -> bool {
    principal.is_staff() || paper.is_authored_by(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::{assignment, paper};
    use uuid::Uuid;

    #[test]
    fn test_staff_assigns_on_submitted_and_starts_review() {
        let p = paper(PaperStatus::Submitted, &[Uuid::new_v4()]);
        let staff = Principal::staff(Uuid::new_v4());
        assert_eq!(
            check_assign_reviewer(&staff, &p, Uuid::new_v4()),
            Ok(AssignmentEffect { starts_review: true })
        );
    }

    #[test]
    fn test_additional_reviewer_under_review() {
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let staff = Principal::staff(Uuid::new_v4());
        assert_eq!(
            check_assign_reviewer(&staff, &p, Uuid::new_v4()),
            Ok(AssignmentEffect { starts_review: false })
        );
    }

    #[test]
    fn test_non_staff_cannot_assign() {
        let author = Uuid::new_v4();
        let p = paper(PaperStatus::Submitted, &[author]);
        assert_eq!(
            check_assign_reviewer(&Principal::student(author), &p, Uuid::new_v4()),
            Err(ReviewDenial::RequiresStaff)
        );
        assert!(!can_assign_reviewer(&Principal::Anonymous, &p, Uuid::new_v4()));
    }

    #[test]
    fn test_assignment_does_not_skip_stages() {
        let staff = Principal::staff(Uuid::new_v4());
        for status in [PaperStatus::Draft, PaperStatus::Published, PaperStatus::Rejected] {
            let p = paper(status, &[Uuid::new_v4()]);
            assert_eq!(
                check_assign_reviewer(&staff, &p, Uuid::new_v4()),
                Err(ReviewDenial::PaperNotReviewable(status))
            );
        }
    }

    #[test]
    fn test_authors_cannot_review_own_paper() {
        let author = Uuid::new_v4();
        let p = paper(PaperStatus::Submitted, &[Uuid::new_v4(), author]);
        let staff = Principal::staff(Uuid::new_v4());
        assert_eq!(check_assign_reviewer(&staff, &p, author), Err(ReviewDenial::ReviewerIsAuthor));
    }

    #[test]
    fn test_reviewer_role_is_irrelevant() {
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let staff = Principal::staff(Uuid::new_v4());
        assert!(can_assign_reviewer(&staff, &p, staff.user_id().unwrap()));
    }

    #[test]
    fn test_complete_review_once_by_reviewer() {
        let reviewer = Uuid::new_v4();
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let open = assignment(&p, reviewer, AssignmentStatus::Assigned);
        let done = assignment(&p, reviewer, AssignmentStatus::Completed);

        assert!(can_complete_review(&Principal::student(reviewer), &p, &open));
        assert_eq!(
            check_complete_review(&Principal::student(reviewer), &p, &done),
            Err(ReviewDenial::AlreadyCompleted)
        );
    }

    #[test]
    fn test_only_reviewer_completes() {
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let a = assignment(&p, Uuid::new_v4(), AssignmentStatus::Assigned);

        assert_eq!(
            check_complete_review(&Principal::staff(Uuid::new_v4()), &p, &a),
            Err(ReviewDenial::NotAssignedReviewer)
        );
        assert_eq!(
            check_complete_review(&Principal::Anonymous, &p, &a),
            Err(ReviewDenial::NotAssignedReviewer)
        );
    }

    #[test]
    fn test_completion_requires_paper_under_review() {
        let reviewer = Uuid::new_v4();
        let principal = Principal::student(reviewer);
        for status in [
            PaperStatus::Draft,
            PaperStatus::Submitted,
            PaperStatus::Published,
            PaperStatus::Rejected,
        ] {
            let p = paper(status, &[Uuid::new_v4()]);
            let open = assignment(&p, reviewer, AssignmentStatus::Assigned);
            assert_eq!(
                check_complete_review(&principal, &p, &open),
                Err(ReviewDenial::PaperNotReviewable(status))
            );
        }
    }

    #[test]
    fn test_completion_checks_assignment_belongs_to_paper() {
        let reviewer = Uuid::new_v4();
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let elsewhere = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let a = assignment(&elsewhere, reviewer, AssignmentStatus::Assigned);
        assert!(!can_complete_review(&Principal::student(reviewer), &p, &a));
    }

    #[test]
    fn test_remove_assignment() {
        let p = paper(PaperStatus::UnderReview, &[Uuid::new_v4()]);
        let reviewer = Uuid::new_v4();
        let open = assignment(&p, reviewer, AssignmentStatus::Assigned);
        let done = assignment(&p, reviewer, AssignmentStatus::Completed);
        let staff = Principal::staff(Uuid::new_v4());

        assert_eq!(check_remove_assignment(&staff, &open), Ok(()));
        assert_eq!(check_remove_assignment(&staff, &done), Err(ReviewDenial::AlreadyCompleted));
        assert_eq!(
            check_remove_assignment(&Principal::student(reviewer), &open),
            Err(ReviewDenial::RequiresStaff)
        );
        assert!(!can_remove_assignment(&Principal::Anonymous, &open));
    }

    #[test]
    fn test_view_reviews() {
        let author = Uuid::new_v4();
        let p = paper(PaperStatus::UnderReview, &[author]);
        assert!(can_view_reviews(&Principal::student(author), &p));
        assert!(can_view_reviews(&Principal::staff(Uuid::new_v4()), &p));
        assert!(!can_view_reviews(&Principal::student(Uuid::new_v4()), &p));
        assert!(!can_view_reviews(&Principal::Anonymous, &p));
    }

    #[test]
    fn test_view_assignments() {
        assert!(can_view_assignments(&Principal::staff(Uuid::new_v4())));
        assert!(!can_view_assignments(&Principal::student(Uuid::new_v4())));
        assert!(!can_view_assignments(&Principal::Anonymous));
    }
}
