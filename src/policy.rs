//! Borrowing and account-status policy rules.
//!
//! Both evaluators here are pure: they look only at the counts and statuses
//! they are handed and return a decision with a user-visible reason. All
//! persistent state lives in Postgres; the repository layer is responsible
//! for calling these inside a transaction so the snapshot they see is
//! consistent (see [`crate::repository::borrows`]).

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::user::UserStatus;

/// Maximum number of concurrently open borrows per user.
pub const MAX_ACTIVE_BORROWS: i64 = 3;

/// Outcome of a borrow eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowDecision {
    Allow,
    DenyLimitReached,
    DenyUnavailable,
}

impl BorrowDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, BorrowDecision::Allow)
    }

    /// User-visible reason for a denial, `None` on Allow.
    pub fn reason(&self) -> Option<String> {
        match self {
            BorrowDecision::Allow => None,
            BorrowDecision::DenyLimitReached => Some(format!(
                "You have reached the maximum number of active borrowings ({})",
                MAX_ACTIVE_BORROWS
            )),
            BorrowDecision::DenyUnavailable => {
                Some("Book is not available for borrowing".to_string())
            }
        }
    }
}

/// Decide whether a member may borrow a book copy.
///
/// The limit check runs first: a member at the cap is denied even when
/// copies are available.
pub fn evaluate_borrow(open_borrows: i64, available_copies: i32) -> BorrowDecision {
    if open_borrows >= MAX_ACTIVE_BORROWS {
        BorrowDecision::DenyLimitReached
    } else if available_copies <= 0 {
        BorrowDecision::DenyUnavailable
    } else {
        BorrowDecision::Allow
    }
}

/// Outcome of a status transition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    Allow,
    /// The (from, to) pair is not in the transition table.
    Deny { reason: String },
}

impl TransitionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TransitionDecision::Allow)
    }
}

/// Allowed account-status transitions, keyed by current status.
///
/// `Banned` is terminal. A status absent from the map gets an empty
/// allowed set.
static STATUS_TRANSITIONS: Lazy<HashMap<UserStatus, &'static [UserStatus]>> = Lazy::new(|| {
    use UserStatus::*;
    HashMap::from([
        (
            PendingVerification,
            &[Active, Rejected, Banned] as &'static [UserStatus],
        ),
        (Active, &[Suspended, Banned, Inactive, PendingVerification]),
        (Suspended, &[Active, Inactive, Banned]),
        (Banned, &[]),
        (Rejected, &[PendingVerification, Banned]),
        (Inactive, &[Active, PendingVerification]),
    ])
});

/// Statuses reachable from `from` in one admin action.
pub fn allowed_transitions(from: UserStatus) -> &'static [UserStatus] {
    STATUS_TRANSITIONS.get(&from).copied().unwrap_or(&[])
}

/// Decide whether an admin-requested status change is legal.
///
/// `from` is `None` when the stored status did not parse; an unknown current
/// status has no legal transitions (fail closed).
pub fn evaluate_transition(from: Option<UserStatus>, to: UserStatus) -> TransitionDecision {
    let Some(from) = from else {
        return TransitionDecision::Deny {
            reason: format!("Current status is not recognized, cannot change to {}", to),
        };
    };

    if allowed_transitions(from).contains(&to) {
        TransitionDecision::Allow
    } else {
        TransitionDecision::Deny {
            reason: format!("Invalid status change from {} to {}", from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use UserStatus::*;

    #[test]
    fn test_borrow_limit_reached() {
        // Limit wins regardless of availability
        assert_eq!(evaluate_borrow(3, 10), BorrowDecision::DenyLimitReached);
        assert_eq!(evaluate_borrow(3, 0), BorrowDecision::DenyLimitReached);
        assert_eq!(evaluate_borrow(7, 1), BorrowDecision::DenyLimitReached);
    }

    #[test]
    fn test_borrow_unavailable() {
        assert_eq!(evaluate_borrow(0, 0), BorrowDecision::DenyUnavailable);
        assert_eq!(evaluate_borrow(2, 0), BorrowDecision::DenyUnavailable);
    }

    #[test]
    fn test_borrow_allowed() {
        assert_eq!(evaluate_borrow(0, 1), BorrowDecision::Allow);
        assert_eq!(evaluate_borrow(2, 5), BorrowDecision::Allow);
        assert!(evaluate_borrow(2, 1).is_allowed());
    }

    #[test]
    fn test_borrow_decision_reason() {
        assert!(evaluate_borrow(0, 1).reason().is_none());
        assert!(evaluate_borrow(3, 1).reason().unwrap().contains("maximum"));
        assert!(evaluate_borrow(0, 0)
            .reason()
            .unwrap()
            .contains("not available"));
    }

    #[test]
    fn test_borrow_is_pure() {
        assert_eq!(evaluate_borrow(2, 1), evaluate_borrow(2, 1));
        assert_eq!(evaluate_borrow(3, 4), evaluate_borrow(3, 4));
    }

    #[test]
    fn test_banned_is_terminal() {
        for to in [PendingVerification, Active, Suspended, Banned, Rejected, Inactive] {
            assert!(!evaluate_transition(Some(Banned), to).is_allowed());
        }
        assert!(allowed_transitions(Banned).is_empty());
    }

    #[test]
    fn test_pending_verification_transitions() {
        assert!(evaluate_transition(Some(PendingVerification), Active).is_allowed());
        assert!(evaluate_transition(Some(PendingVerification), Rejected).is_allowed());
        assert!(evaluate_transition(Some(PendingVerification), Banned).is_allowed());
        assert!(!evaluate_transition(Some(PendingVerification), Suspended).is_allowed());
        assert!(!evaluate_transition(Some(PendingVerification), Inactive).is_allowed());
    }

    #[test]
    fn test_transitions_are_not_symmetric() {
        assert!(evaluate_transition(Some(Active), PendingVerification).is_allowed());
        assert!(!evaluate_transition(Some(PendingVerification), Inactive).is_allowed());
        assert!(evaluate_transition(Some(Inactive), Active).is_allowed());
        assert!(!evaluate_transition(Some(Active), Rejected).is_allowed());
    }

    #[test]
    fn test_no_self_loops() {
        for s in [PendingVerification, Active, Suspended, Banned, Rejected, Inactive] {
            assert!(!evaluate_transition(Some(s), s).is_allowed());
        }
    }

    #[test]
    fn test_unknown_status_fails_closed() {
        for to in [PendingVerification, Active, Suspended, Banned, Rejected, Inactive] {
            assert!(!evaluate_transition(None, to).is_allowed());
        }
    }

    #[test]
    fn test_deny_reason_names_the_pair() {
        let TransitionDecision::Deny { reason } = evaluate_transition(Some(Suspended), Rejected)
        else {
            panic!("expected deny");
        };
        assert!(reason.contains("Suspended"));
        assert!(reason.contains("Rejected"));
    }
}
