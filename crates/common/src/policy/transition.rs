//! The publication workflow as an explicit transition table
//!
//! ```text
//! draft -> submitted -> under_review -> published
//!                                    \-> rejected -> (new) draft
//! ```
//!
//! The table is the only source of legal moves. UI affordances, the
//! gateway's mutation guard, and the conditional update issued to the
//! store all read from it.

use serde::Serialize;
use std::fmt;

use super::principal::Principal;
use super::snapshot::PaperSnapshot;
use super::status::PaperStatus;

/// Who may invoke a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// Any author of the paper, whatever their role
    Author,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub from: PaperStatus,
    pub to: PaperStatus,
    pub actor: Actor,
}

pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule { from: PaperStatus::Draft, to: PaperStatus::Submitted, actor: Actor::Author },
    TransitionRule { from: PaperStatus::Submitted, to: PaperStatus::UnderReview, actor: Actor::Staff },
    TransitionRule { from: PaperStatus::UnderReview, to: PaperStatus::Published, actor: Actor::Staff },
    TransitionRule { from: PaperStatus::UnderReview, to: PaperStatus::Rejected, actor: Actor::Staff },
    TransitionRule { from: PaperStatus::Rejected, to: PaperStatus::Draft, actor: Actor::Author },
];

/// Why a transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDenial {
    /// No rule moves `from` to `to`
    NotInTable { from: PaperStatus, to: PaperStatus },
    Anonymous,
    RequiresAuthor,
    RequiresStaff,
}

impl fmt::Display for TransitionDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionDenial::NotInTable { from, to } => {
                write!(f, "no transition from {} to {}", from, to)
            }
            TransitionDenial::Anonymous => f.write_str("anonymous principals cannot change paper status"),
            TransitionDenial::RequiresAuthor => f.write_str("only an author of the paper may do this"),
            TransitionDenial::RequiresStaff => f.write_str("only staff may do this"),
        }
    }
}

/// Look up the rule for a move, ignoring who asks
pub fn rule_for(from: PaperStatus, to: PaperStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|r| r.from == from && r.to == to)
}

fn actor_permits(actor: Actor, principal: &Principal, paper: &PaperSnapshot) -> Result<(), TransitionDenial> {
    match actor {
        Actor::Author if paper.is_authored_by(principal) => Ok(()),
        Actor::Author => Err(TransitionDenial::RequiresAuthor),
        Actor::Staff if principal.is_staff() => Ok(()),
        Actor::Staff => Err(TransitionDenial::RequiresStaff),
    }
}

/// Decide a transition and say why when refusing
pub fn check_transition(
    principal: &Principal,
    paper: &PaperSnapshot,
    target: PaperStatus,
) -> Result<&'static TransitionRule, TransitionDenial> {
    let rule = rule_for(paper.status, target).ok_or(TransitionDenial::NotInTable {
        from: paper.status,
        to: target,
    })?;

    if !principal.is_authenticated() {
        return Err(TransitionDenial::Anonymous);
    }

    actor_permits(rule.actor, principal, paper)?;
    Ok(rule)
}

/// Whether `principal` may move `paper` to `target`
pub fn can_transition(principal: &Principal, paper: &PaperSnapshot, target: PaperStatus) -> bool {
    check_transition(principal, paper, target).is_ok()
}

/// Every target the principal could move this paper to right now
pub fn allowed_transitions(principal: &Principal, paper: &PaperSnapshot) -> Vec<PaperStatus> {
    TRANSITIONS
        .iter()
        .filter(|r| r.from == paper.status)
        .filter(|r| actor_permits(r.actor, principal, paper).is_ok())
        .map(|r| r.to)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::paper;
    use uuid::Uuid;

    struct Cast {
        author: Principal,
        staff_author: Principal,
        staff: Principal,
        stranger: Principal,
    }

    fn cast() -> (Cast, Vec<Uuid>) {
        let author = Uuid::new_v4();
        let staff_author = Uuid::new_v4();
        (
            Cast {
                author: Principal::student(author),
                staff_author: Principal::staff(staff_author),
                staff: Principal::staff(Uuid::new_v4()),
                stranger: Principal::student(Uuid::new_v4()),
            },
            vec![author, staff_author],
        )
    }

    fn everyone(c: &Cast) -> [Principal; 5] {
        [c.author, c.staff_author, c.staff, c.stranger, Principal::Anonymous]
    }

    #[test]
    fn test_no_self_transitions() {
        let (c, authors) = cast();
        for status in PaperStatus::ALL {
            let p = paper(status, &authors);
            for who in everyone(&c) {
                assert!(!can_transition(&who, &p, status), "{:?} allowed {} -> {}", who, status, status);
            }
        }
    }

    #[test]
    fn test_only_table_pairs_are_ever_allowed() {
        let (c, authors) = cast();
        for from in PaperStatus::ALL {
            let p = paper(from, &authors);
            for to in PaperStatus::ALL {
                let in_table = rule_for(from, to).is_some();
                for who in everyone(&c) {
                    if can_transition(&who, &p, to) {
                        assert!(in_table, "{:?} allowed {} -> {} outside the table", who, from, to);
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_table_pair_has_some_permitted_principal() {
        let (c, authors) = cast();
        for rule in TRANSITIONS {
            let p = paper(rule.from, &authors);
            assert!(
                everyone(&c).iter().any(|who| can_transition(who, &p, rule.to)),
                "nobody may perform {} -> {}",
                rule.from,
                rule.to
            );
        }
    }

    #[test]
    fn test_submit_by_author_only() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::Draft, &authors);
        assert!(can_transition(&c.author, &p, PaperStatus::Submitted));
        assert!(can_transition(&c.staff_author, &p, PaperStatus::Submitted));
        assert!(!can_transition(&c.staff, &p, PaperStatus::Submitted));
        assert!(!can_transition(&c.stranger, &p, PaperStatus::Submitted));
        assert!(!can_transition(&Principal::Anonymous, &p, PaperStatus::Submitted));
    }

    #[test]
    fn test_review_start_by_staff_only() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::Submitted, &authors);
        assert!(can_transition(&c.staff, &p, PaperStatus::UnderReview));
        assert!(can_transition(&c.staff_author, &p, PaperStatus::UnderReview));
        assert!(!can_transition(&c.author, &p, PaperStatus::UnderReview));
        assert!(!can_transition(&c.stranger, &p, PaperStatus::UnderReview));
    }

    #[test]
    fn test_decisions_by_staff_only() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::UnderReview, &authors);
        for target in [PaperStatus::Published, PaperStatus::Rejected] {
            assert!(can_transition(&c.staff, &p, target));
            assert!(!can_transition(&c.author, &p, target));
            assert!(!can_transition(&c.stranger, &p, target));
            assert!(!can_transition(&Principal::Anonymous, &p, target));
        }
    }

    #[test]
    fn test_staff_cannot_skip_review() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::Submitted, &authors);
        assert!(!can_transition(&c.staff, &p, PaperStatus::Published));
        assert_eq!(
            check_transition(&c.staff, &p, PaperStatus::Published),
            Err(TransitionDenial::NotInTable {
                from: PaperStatus::Submitted,
                to: PaperStatus::Published
            })
        );
        assert!(!can_transition(&c.staff, &p, PaperStatus::Rejected));
    }

    #[test]
    fn test_no_skipping_from_draft() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::Draft, &authors);
        for target in [PaperStatus::UnderReview, PaperStatus::Published, PaperStatus::Rejected] {
            for who in everyone(&c) {
                assert!(!can_transition(&who, &p, target));
            }
        }
    }

    #[test]
    fn test_no_backward_moves() {
        let (c, authors) = cast();
        let backward = [
            (PaperStatus::Submitted, PaperStatus::Draft),
            (PaperStatus::UnderReview, PaperStatus::Submitted),
            (PaperStatus::UnderReview, PaperStatus::Draft),
            (PaperStatus::Published, PaperStatus::UnderReview),
            (PaperStatus::Published, PaperStatus::Draft),
        ];
        for (from, to) in backward {
            let p = paper(from, &authors);
            for who in everyone(&c) {
                assert!(!can_transition(&who, &p, to), "{:?} moved {} back to {}", who, from, to);
            }
        }
    }

    #[test]
    fn test_published_is_final() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::Published, &authors);
        for who in everyone(&c) {
            assert!(allowed_transitions(&who, &p).is_empty());
        }
    }

    #[test]
    fn test_rejected_reenters_only_as_draft_by_author() {
        let (c, authors) = cast();
        let p = paper(PaperStatus::Rejected, &authors);

        for to in PaperStatus::ALL {
            for who in everyone(&c) {
                let allowed = can_transition(&who, &p, to);
                let expected = to == PaperStatus::Draft && p.is_authored_by(&who);
                assert_eq!(allowed, expected, "{:?} rejected -> {}", who, to);
            }
        }
        assert_eq!(
            check_transition(&c.staff, &p, PaperStatus::Draft),
            Err(TransitionDenial::RequiresAuthor)
        );
    }

    #[test]
    fn test_outsiders_always_rejected() {
        let (c, authors) = cast();
        for from in PaperStatus::ALL {
            let p = paper(from, &authors);
            for to in PaperStatus::ALL {
                assert!(!can_transition(&c.stranger, &p, to));
                assert!(!can_transition(&Principal::Anonymous, &p, to));
            }
        }
    }

    #[test]
    fn test_denial_reasons() {
        let (c, authors) = cast();
        let draft = paper(PaperStatus::Draft, &authors);
        let reviewing = paper(PaperStatus::UnderReview, &authors);

        assert_eq!(
            check_transition(&Principal::Anonymous, &draft, PaperStatus::Submitted),
            Err(TransitionDenial::Anonymous)
        );
        assert_eq!(
            check_transition(&c.stranger, &draft, PaperStatus::Submitted),
            Err(TransitionDenial::RequiresAuthor)
        );
        assert_eq!(
            check_transition(&c.author, &reviewing, PaperStatus::Published),
            Err(TransitionDenial::RequiresStaff)
        );
        assert_eq!(
            check_transition(&c.author, &draft, PaperStatus::Submitted).map(|r| r.actor),
            Ok(Actor::Author)
        );
    }

    #[test]
    fn test_allowed_transitions_for_affordances() {
        let (c, authors) = cast();

        let draft = paper(PaperStatus::Draft, &authors);
        assert_eq!(allowed_transitions(&c.author, &draft), vec![PaperStatus::Submitted]);
        assert!(allowed_transitions(&c.staff, &draft).is_empty());

        let reviewing = paper(PaperStatus::UnderReview, &authors);
        assert!(allowed_transitions(&c.author, &reviewing).is_empty());
        assert_eq!(
            allowed_transitions(&c.staff, &reviewing),
            vec![PaperStatus::Published, PaperStatus::Rejected]
        );
        assert!(allowed_transitions(&Principal::Anonymous, &reviewing).is_empty());
    }

    #[test]
    fn test_allowed_transitions_agree_with_can_transition() {
        let (c, authors) = cast();
        for from in PaperStatus::ALL {
            let p = paper(from, &authors);
            for who in everyone(&c) {
                let allowed = allowed_transitions(&who, &p);
                for to in PaperStatus::ALL {
                    assert_eq!(allowed.contains(&to), can_transition(&who, &p, to));
                }
            }
        }
    }

    #[test]
    fn test_denial_messages() {
        let denial = TransitionDenial::NotInTable {
            from: PaperStatus::Submitted,
            to: PaperStatus::Published,
        };
        assert_eq!(denial.to_string(), "no transition from submitted to published");
    }
}
