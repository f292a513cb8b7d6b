//! Status lifecycle tables and transition validation
//!
//! Every entity with a lifecycle declares its legal edges in one static
//! table here, shared by all routes. Terminal statuses map to an empty
//! allowed set. Handlers may skip validation when the caller passes an
//! explicit `force` flag.

use std::fmt;

/// Entity kinds that carry a lifecycle status column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Lead,
    Contract,
    Proposal,
    Task,
    Invoice,
    PayrollRun,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::Lead => write!(f, "lead"),
            LifecycleKind::Contract => write!(f, "contract"),
            LifecycleKind::Proposal => write!(f, "proposal"),
            LifecycleKind::Task => write!(f, "task"),
            LifecycleKind::Invoice => write!(f, "invoice"),
            LifecycleKind::PayrollRun => write!(f, "payroll run"),
        }
    }
}

/// A disallowed transition, naming the offending pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub kind: LifecycleKind,
    pub from: String,
    pub to: String,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot move {} from '{}' to '{}'",
            self.kind, self.from, self.to
        )
    }
}

impl std::error::Error for TransitionError {}

/// Transition table for an entity kind: status -> allowed next statuses
pub fn transition_table(kind: LifecycleKind) -> &'static [(&'static str, &'static [&'static str])] {
    match kind {
        LifecycleKind::Lead => &[
            ("new", &["contacted", "lost"]),
            ("contacted", &["qualified", "lost"]),
            ("qualified", &["converted", "lost"]),
            // Explicit revert edge; converted is terminal
            ("lost", &["contacted"]),
            ("converted", &[]),
        ],
        LifecycleKind::Contract => &[
            ("draft", &["sent"]),
            ("sent", &["viewed", "declined", "expired"]),
            ("viewed", &["signed", "declined", "expired"]),
            ("declined", &["draft"]),
            ("expired", &["draft"]),
            ("signed", &[]),
        ],
        LifecycleKind::Proposal => &[
            ("draft", &["sent"]),
            ("sent", &["viewed", "declined", "expired"]),
            ("viewed", &["accepted", "declined", "expired"]),
            ("declined", &["draft"]),
            ("expired", &["draft"]),
            ("accepted", &[]),
        ],
        LifecycleKind::Task => &[
            ("todo", &["in_progress"]),
            ("in_progress", &["done", "blocked", "todo"]),
            ("blocked", &["in_progress"]),
            ("done", &[]),
        ],
        LifecycleKind::Invoice => &[
            ("draft", &["sent", "void"]),
            ("sent", &["paid", "overdue", "void"]),
            ("overdue", &["paid", "void"]),
            ("paid", &[]),
            ("void", &[]),
        ],
        LifecycleKind::PayrollRun => &[
            ("draft", &["approved"]),
            ("approved", &["completed", "draft"]),
            ("completed", &[]),
        ],
    }
}

/// The status a newly created entity of this kind starts in
pub fn initial_status(kind: LifecycleKind) -> &'static str {
    transition_table(kind)[0].0
}

/// Allowed next statuses for `from`, or None if `from` is unknown
pub fn allowed_next(kind: LifecycleKind, from: &str) -> Option<&'static [&'static str]> {
    transition_table(kind)
        .iter()
        .find(|(status, _)| *status == from)
        .map(|(_, next)| *next)
}

/// Whether `status` appears anywhere in the kind's table
pub fn is_known_status(kind: LifecycleKind, status: &str) -> bool {
    transition_table(kind)
        .iter()
        .any(|(from, _)| *from == status)
}

/// Validate a requested transition against the kind's table.
///
/// Unknown `from` or `to` statuses are rejected, never silently allowed.
pub fn validate_transition(
    kind: LifecycleKind,
    from: &str,
    to: &str,
) -> Result<(), TransitionError> {
    let err = || TransitionError {
        kind,
        from: from.to_string(),
        to: to.to_string(),
    };

    if !is_known_status(kind, to) {
        return Err(err());
    }

    match allowed_next(kind, from) {
        Some(next) if next.contains(&to) => Ok(()),
        _ => Err(err()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: &[LifecycleKind] = &[
        LifecycleKind::Lead,
        LifecycleKind::Contract,
        LifecycleKind::Proposal,
        LifecycleKind::Task,
        LifecycleKind::Invoice,
        LifecycleKind::PayrollRun,
    ];

    #[test]
    fn test_allowed_iff_declared() {
        // For every (from, to) pair over the declared statuses, validate
        // succeeds exactly when the table declares the edge.
        for &kind in ALL_KINDS {
            let table = transition_table(kind);
            for (from, _) in table {
                for (to, _) in table {
                    let declared = allowed_next(kind, from).unwrap().contains(to);
                    let result = validate_transition(kind, from, to);
                    assert_eq!(
                        result.is_ok(),
                        declared,
                        "{} {} -> {}",
                        kind,
                        from,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_edges() {
        assert!(allowed_next(LifecycleKind::Contract, "signed").unwrap().is_empty());
        assert!(allowed_next(LifecycleKind::Proposal, "accepted").unwrap().is_empty());
        assert!(allowed_next(LifecycleKind::Lead, "converted").unwrap().is_empty());
        assert!(allowed_next(LifecycleKind::Task, "done").unwrap().is_empty());
        assert!(allowed_next(LifecycleKind::Invoice, "paid").unwrap().is_empty());
        assert!(allowed_next(LifecycleKind::PayrollRun, "completed").unwrap().is_empty());
    }

    #[test]
    fn test_signed_contract_rejects_draft() {
        let err = validate_transition(LifecycleKind::Contract, "signed", "draft").unwrap_err();
        assert_eq!(err.from, "signed");
        assert_eq!(err.to, "draft");
        assert!(err.to_string().contains("signed"));
        assert!(err.to_string().contains("draft"));
    }

    #[test]
    fn test_unknown_statuses_rejected() {
        assert!(validate_transition(LifecycleKind::Lead, "new", "archived").is_err());
        assert!(validate_transition(LifecycleKind::Lead, "bogus", "contacted").is_err());
        assert!(!is_known_status(LifecycleKind::Invoice, "refunded"));
    }

    #[test]
    fn test_explicit_revert_edges() {
        assert!(validate_transition(LifecycleKind::Contract, "declined", "draft").is_ok());
        assert!(validate_transition(LifecycleKind::Contract, "expired", "draft").is_ok());
        assert!(validate_transition(LifecycleKind::Lead, "lost", "contacted").is_ok());
        assert!(validate_transition(LifecycleKind::PayrollRun, "approved", "draft").is_ok());
        // Reverts are one-way; no bidirectional edges appear for free
        assert!(validate_transition(LifecycleKind::Contract, "sent", "draft").is_err());
    }

    #[test]
    fn test_initial_statuses() {
        assert_eq!(initial_status(LifecycleKind::Lead), "new");
        assert_eq!(initial_status(LifecycleKind::Contract), "draft");
        assert_eq!(initial_status(LifecycleKind::Task), "todo");
    }
}
