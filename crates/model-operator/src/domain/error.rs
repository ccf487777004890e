//! Error contexts used across reconciliation

use core::error::Error;

use error_stack::Report;

use crate::domain::types::Identity;
use crate::domain::types::ObjectKind;

/// Failures reported by the control plane seam.
#[derive(Debug, Clone, derive_more::Display)]
pub enum ControlPlaneError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Write conflict on {kind} {identity}: stale or duplicate object")]
    Conflict { kind: ObjectKind, identity: Identity },
    #[display("{kind} {identity} rejected by API server ({code}): {reason}")]
    Rejected {
        kind: ObjectKind,
        identity: Identity,
        code: u16,
        reason: String,
    },
    #[display("Kubernetes API unavailable while accessing {kind} {identity}")]
    Unavailable { kind: ObjectKind, identity: Identity },
    #[display("{kind} object is missing {field}")]
    IncompleteObject { kind: String, field: &'static str },
}

impl Error for ControlPlaneError {}

/// Write verb used against a child object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum WriteVerb {
    #[display("create")]
    Create,
    #[display("replace")]
    Replace,
}

/// Reasons a single reconciliation did not converge.
#[derive(Debug, derive_more::Display)]
pub enum ReconcileError {
    #[display("Failed to fetch intent {identity}")]
    IntentLookup { identity: Identity },
    #[display("Failed to fetch {kind} {identity}")]
    ChildLookup { kind: ObjectKind, identity: Identity },
    #[display("Failed to {verb} {kind} {identity}")]
    Write {
        kind: ObjectKind,
        verb: WriteVerb,
        identity: Identity,
    },
    #[display("Failed to attach owner reference to {kind} {identity}")]
    OwnerReference { kind: ObjectKind, identity: Identity },
    #[display("Intent {identity} requests unsupported runtime {selector:?}")]
    UnknownRuntime { identity: Identity, selector: String },
    #[display("Reconciliation of {identity} was cancelled")]
    Cancelled { identity: Identity },
}

impl Error for ReconcileError {}

impl ReconcileError {
    /// Whether the failure came from a write against a stale or duplicate object.
    pub fn is_conflict(report: &Report<Self>) -> bool {
        matches!(
            report.downcast_ref::<ControlPlaneError>(),
            Some(ControlPlaneError::Conflict { .. })
        )
    }

    pub fn is_cancelled(report: &Report<Self>) -> bool {
        matches!(report.current_context(), Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use error_stack::ResultExt;
    use similar_asserts::assert_eq;

    use super::*;

    fn identity() -> Identity {
        Identity::new("default", "llama-7b")
    }

    #[test]
    fn conflict_is_found_below_write_context() {
        let result: Result<(), _> = Err(Report::new(ControlPlaneError::Conflict {
            kind: ObjectKind::Workload,
            identity: identity(),
        }));
        let report = result
            .change_context(ReconcileError::Write {
                kind: ObjectKind::Workload,
                verb: WriteVerb::Replace,
                identity: identity(),
            })
            .expect_err("error");

        assert!(ReconcileError::is_conflict(&report));
        assert!(!ReconcileError::is_cancelled(&report));
    }

    #[test]
    fn rejected_write_is_not_a_conflict() {
        let report = Report::new(ControlPlaneError::Rejected {
            kind: ObjectKind::Endpoint,
            identity: identity(),
            code: 422,
            reason: "Invalid".to_string(),
        })
        .change_context(ReconcileError::Write {
            kind: ObjectKind::Endpoint,
            verb: WriteVerb::Create,
            identity: identity(),
        });

        assert!(!ReconcileError::is_conflict(&report));
    }

    #[test]
    fn display_messages() {
        let err = ReconcileError::Write {
            kind: ObjectKind::Endpoint,
            verb: WriteVerb::Create,
            identity: identity(),
        };
        assert_eq!(err.to_string(), "Failed to create Service default/llama-7b");

        let err = ReconcileError::UnknownRuntime {
            identity: identity(),
            selector: "tpu".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Intent default/llama-7b requests unsupported runtime \"tpu\""
        );
    }
}
