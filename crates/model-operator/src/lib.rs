pub mod config;
pub mod controller;
mod domain;
mod infrastructure;

use api_types::ModelDeployment;
use kube::CustomResourceExt;

// Re-export main modules
pub use domain::builder;
pub use domain::error;
pub use domain::mock;
pub use domain::ownership;
pub use domain::policy;
pub use domain::reconciler;
pub use domain::traits;
pub use domain::types;
pub use domain::Identity;
pub use domain::ReconcileOutcome;
pub use domain::Reconciler;
pub use infrastructure::k8s;
pub use infrastructure::kube_client;

/// Render the ModelDeployment CRD manifest.
pub fn crd_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ModelDeployment::crd())
}
