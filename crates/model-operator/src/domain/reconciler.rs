//! Reconciler
//!
//! Converges the children of one [`ModelDeployment`] toward the state the
//! builder derives from it. Each child kind is probed and written on its own:
//! a missing endpoint is created even when the workload already exists.
//!
//! The reconciler never retries. Every failure is returned to the caller,
//! which decides when to invoke it again.

use std::future::Future;

use api_types::ModelDeployment;
use error_stack::Report;
use error_stack::ResultExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::domain::builder;
use crate::domain::error::ReconcileError;
use crate::domain::error::WriteVerb;
use crate::domain::ownership;
use crate::domain::policy::RuntimePolicyTable;
use crate::domain::traits::ChildObject;
use crate::domain::traits::ControlPlane;
use crate::domain::types::ChildAction;
use crate::domain::types::Identity;
use crate::domain::types::ReconcileOutcome;

pub struct Reconciler<C> {
    control_plane: C,
    policies: RuntimePolicyTable,
}

impl<C: ControlPlane> Reconciler<C> {
    pub fn new(control_plane: C, policies: RuntimePolicyTable) -> Self {
        Self {
            control_plane,
            policies,
        }
    }

    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    /// Reconcile the intent named by `identity`.
    ///
    /// Calls to the control plane run one after another; the first failure
    /// ends the pass. Cancelling `cancel` abandons the remaining calls.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::IntentLookup`] / [`ReconcileError::ChildLookup`] if a read fails
    /// - [`ReconcileError::UnknownRuntime`] if the intent names an unsupported runtime
    /// - [`ReconcileError::OwnerReference`] if the intent cannot own children
    /// - [`ReconcileError::Write`] if a create or replace fails
    /// - [`ReconcileError::Cancelled`] if `cancel` fires first
    #[tracing::instrument(skip(self, cancel), fields(namespace = %identity.namespace, name = %identity.name))]
    pub async fn reconcile(
        &self,
        identity: &Identity,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, Report<ReconcileError>> {
        let intent = cancellable(identity, cancel, self.control_plane.get::<ModelDeployment>(identity))
            .await?
            .change_context_lazy(|| ReconcileError::IntentLookup {
                identity: identity.clone(),
            })?;

        let Some(intent) = intent else {
            info!("ModelDeployment not found, nothing to reconcile");
            return Ok(ReconcileOutcome::IntentGone);
        };

        let workload = builder::build_workload(&intent, &self.policies).change_context_lazy(|| {
            ReconcileError::UnknownRuntime {
                identity: identity.clone(),
                selector: intent.spec.runtime_selector().to_string(),
            }
        })?;
        let workload = self
            .converge_child(&intent, identity, workload, cancel)
            .await?;

        let endpoint = builder::build_endpoint(&intent);
        let endpoint = self
            .converge_child(&intent, identity, endpoint, cancel)
            .await?;

        Ok(ReconcileOutcome::Converged { workload, endpoint })
    }

    /// Create `desired` if its kind is absent, otherwise replace the stored object.
    async fn converge_child<K: ChildObject>(
        &self,
        intent: &ModelDeployment,
        identity: &Identity,
        desired: K,
        cancel: &CancellationToken,
    ) -> Result<ChildAction, Report<ReconcileError>> {
        let kind = K::KIND;
        let current = cancellable(identity, cancel, self.control_plane.get::<K>(identity))
            .await?
            .change_context_lazy(|| ReconcileError::ChildLookup {
                kind,
                identity: identity.clone(),
            })?;

        let mut desired = ownership::attach_owner(intent, desired).change_context_lazy(|| {
            ReconcileError::OwnerReference {
                kind,
                identity: identity.clone(),
            }
        })?;

        let (verb, action) = match &current {
            None => (WriteVerb::Create, ChildAction::Created),
            Some(_) => (WriteVerb::Replace, ChildAction::Updated),
        };
        let write_failed = || ReconcileError::Write {
            kind,
            verb,
            identity: identity.clone(),
        };

        match current {
            None => {
                debug!(%kind, "child absent");
                cancellable(identity, cancel, self.control_plane.create(&desired))
                    .await?
                    .change_context_lazy(write_failed)?;
            }
            Some(current) => {
                desired.carry_over(&current);
                cancellable(identity, cancel, self.control_plane.replace(&desired))
                    .await?
                    .change_context_lazy(write_failed)?;
            }
        }

        info!(%kind, %action, "child reconciled");
        Ok(action)
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<F>(
    identity: &Identity,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, Report<ReconcileError>>
where
    F: Future,
{
    select! {
        biased;
        _ = cancel.cancelled() => Err(Report::new(ReconcileError::Cancelled {
            identity: identity.clone(),
        })),
        output = fut => Ok(output),
    }
}
