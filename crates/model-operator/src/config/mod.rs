pub mod cli;
pub mod controller;

use std::time::Duration;

use crate::domain::policy::RuntimePolicyTable;

/// Requeue delays the controller's error policy applies after a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeueConfig {
    /// Delay after a write conflict; the next pass re-reads fresh versions.
    pub conflict: Duration,
    /// Delay after any other failure.
    pub error: Duration,
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            conflict: Duration::from_secs(1),
            error: Duration::from_secs(15),
        }
    }
}

impl From<&controller::ControllerArgs> for RequeueConfig {
    fn from(args: &controller::ControllerArgs) -> Self {
        Self {
            conflict: Duration::from_secs(args.conflict_requeue_secs),
            error: Duration::from_secs(args.error_requeue_secs),
        }
    }
}

impl From<&controller::ControllerArgs> for RuntimePolicyTable {
    fn from(args: &controller::ControllerArgs) -> Self {
        RuntimePolicyTable::with_images(args.cpu_image.clone(), args.gpu_image.clone())
    }
}

pub use cli::*;
pub use controller::*;
