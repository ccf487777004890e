//! Kubernetes integration module.
//!
//! Implements the control plane seam on top of `kube::Api`.

pub mod control_plane;

pub use control_plane::KubeControlPlane;
