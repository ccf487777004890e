//! Shared types for model deployment reconciliation

use std::fmt;

use error_stack::Report;
use kube::Resource;
use kube::ResourceExt;

use crate::domain::error::ControlPlaneError;

/// Namespaced identity of an intent object and of every child it owns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity {
    pub namespace: String,
    pub name: String,
}

impl Identity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of an existing namespaced object.
    ///
    /// # Errors
    ///
    /// - [`ControlPlaneError::IncompleteObject`] if the object has no name or namespace
    pub fn of<K>(object: &K) -> Result<Self, Report<ControlPlaneError>>
    where
        K: Resource<DynamicType = ()>,
    {
        let kind = K::kind(&()).to_string();
        let name = object
            .meta()
            .name
            .clone()
            .ok_or_else(|| ControlPlaneError::IncompleteObject {
                kind: kind.clone(),
                field: "metadata.name",
            })?;
        let namespace = object
            .namespace()
            .ok_or_else(|| ControlPlaneError::IncompleteObject {
                kind,
                field: "metadata.namespace",
            })?;
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object kinds the reconciler reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum ObjectKind {
    #[display("ModelDeployment")]
    Intent,
    #[display("Deployment")]
    Workload,
    #[display("Service")]
    Endpoint,
}

/// Write issued for a single child during one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ChildAction {
    #[display("created")]
    Created,
    #[display("updated")]
    Updated,
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The intent no longer exists; nothing was written.
    IntentGone,
    /// Both children were written.
    Converged {
        workload: ChildAction,
        endpoint: ChildAction,
    },
}
