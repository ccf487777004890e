pub mod builder;
pub mod error;
pub mod mock;
pub mod ownership;
pub mod policy;
pub mod reconciler;
pub mod traits;
pub mod types;

// Re-export concrete types for convenience
pub use reconciler::Reconciler;
pub use types::Identity;
pub use types::ReconcileOutcome;
