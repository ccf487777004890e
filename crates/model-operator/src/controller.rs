//! ModelDeployment controller wiring
//!
//! Hooks the [`Reconciler`] up to `kube::runtime::Controller`, which owns the
//! watch, the work queue and the retry schedule. Changes to owned Deployments
//! and Services requeue their intent.

use std::sync::Arc;

use api_types::ModelDeployment;
use error_stack::Report;
use error_stack::ResultExt;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use kube::runtime::watcher;
use kube::runtime::Controller;
use kube::Api;
use kube::Client;
use kube::Resource;
use kube::ResourceExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::ControllerArgs;
use crate::config::RequeueConfig;
use crate::domain::error::ReconcileError;
use crate::domain::policy::RuntimePolicyTable;
use crate::domain::traits::ControlPlane;
use crate::domain::types::Identity;
use crate::domain::types::ReconcileOutcome;
use crate::domain::Reconciler;
use crate::infrastructure::k8s::KubeControlPlane;

/// Error type handed to `kube::runtime`, which needs a `std::error::Error`.
#[derive(Debug, derive_more::Display)]
#[display("{_0:?}")]
pub struct ReconcileFailure(pub Report<ReconcileError>);

impl std::error::Error for ReconcileFailure {}

/// Shared state for every reconciliation the controller runs.
pub struct Context<C> {
    pub reconciler: Reconciler<C>,
    pub requeue: RequeueConfig,
    pub cancel: CancellationToken,
}

/// Reconcile entry point invoked by the controller for one changed intent.
///
/// The intent is looked up again by identity rather than trusting the cached
/// copy, so an object deleted in the meantime ends as a no-op.
pub async fn reconcile<C: ControlPlane>(
    intent: Arc<ModelDeployment>,
    ctx: Arc<Context<C>>,
) -> Result<Action, ReconcileFailure> {
    let identity = Identity::of(intent.as_ref())
        .change_context_lazy(|| ReconcileError::IntentLookup {
            identity: Identity::new(intent.namespace().unwrap_or_default(), intent.name_any()),
        })
        .map_err(ReconcileFailure)?;

    let outcome = ctx
        .reconciler
        .reconcile(&identity, &ctx.cancel)
        .await
        .map_err(ReconcileFailure)?;

    if let ReconcileOutcome::Converged { workload, endpoint } = outcome {
        info!(%identity, %workload, %endpoint, "ModelDeployment reconciled");
    }
    Ok(Action::await_change())
}

/// Requeue strategy for a failed pass.
pub fn error_policy<C>(
    intent: Arc<ModelDeployment>,
    failure: &ReconcileFailure,
    ctx: Arc<Context<C>>,
) -> Action {
    let report = &failure.0;
    if ReconcileError::is_cancelled(report) {
        info!(name = %intent.name_any(), "reconciliation cancelled, not requeueing");
        return Action::await_change();
    }

    error!(
        name = %intent.name_any(),
        namespace = ?intent.namespace(),
        "reconciliation failed: {report:?}"
    );
    if ReconcileError::is_conflict(report) {
        Action::requeue(ctx.requeue.conflict)
    } else {
        Action::requeue(ctx.requeue.error)
    }
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the controller until `cancel` fires or the process receives a
/// termination signal.
#[tracing::instrument(skip(client, args, cancel), fields(namespace = ?args.namespace))]
pub async fn run(client: Client, args: &ControllerArgs, cancel: CancellationToken) {
    let namespace = args.namespace.as_deref();
    let intents: Api<ModelDeployment> = scoped_api(&client, namespace);
    let workloads: Api<Deployment> = scoped_api(&client, namespace);
    let endpoints: Api<Service> = scoped_api(&client, namespace);

    let ctx = Arc::new(Context {
        reconciler: Reconciler::new(
            KubeControlPlane::new(client),
            RuntimePolicyTable::from(args),
        ),
        requeue: RequeueConfig::from(args),
        cancel: cancel.clone(),
    });

    info!("Starting ModelDeployment controller");
    let controller = Controller::new(intents, watcher::Config::default())
        .owns(workloads, watcher::Config::default())
        .owns(endpoints, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => {
                    tracing::debug!(name = %object.name, namespace = ?object.namespace, "reconcile finished")
                }
                Err(e) => warn!("reconcile dispatch failed: {e}"),
            }
        });

    select! {
        _ = cancel.cancelled() => {
            info!("ModelDeployment controller shutdown requested");
        }
        _ = controller => {
            info!("ModelDeployment controller stopped");
        }
    }
}
