//! Traits for control plane access

use std::fmt::Debug;

use api_types::ModelDeployment;
use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::error::ControlPlaneError;
use crate::domain::types::Identity;
use crate::domain::types::ObjectKind;

/// Namespaced object the reconciler reads or writes.
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: ObjectKind;
}

impl ManagedObject for ModelDeployment {
    const KIND: ObjectKind = ObjectKind::Intent;
}

impl ManagedObject for Deployment {
    const KIND: ObjectKind = ObjectKind::Workload;
}

impl ManagedObject for Service {
    const KIND: ObjectKind = ObjectKind::Endpoint;
}

/// Child object the reconciler owns and fully replaces on update.
pub trait ChildObject: ManagedObject {
    /// Copy fields the API server assigns on create, and requires unchanged on
    /// replace, from the stored object onto the desired one.
    fn carry_over(&mut self, current: &Self);
}

impl ChildObject for Deployment {
    fn carry_over(&mut self, current: &Self) {
        self.metadata.resource_version = current.metadata.resource_version.clone();
    }
}

impl ChildObject for Service {
    fn carry_over(&mut self, current: &Self) {
        self.metadata.resource_version = current.metadata.resource_version.clone();
        if let (Some(desired), Some(current)) = (self.spec.as_mut(), current.spec.as_ref()) {
            desired.cluster_ip = current.cluster_ip.clone();
            desired.cluster_ips = current.cluster_ips.clone();
        }
    }
}

/// Blocking get/create/replace primitives of the control plane.
///
/// A write against a stale `resourceVersion`, or a create of an object that
/// already exists, fails with [`ControlPlaneError::Conflict`].
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch an object; `Ok(None)` means it does not exist.
    async fn get<K: ManagedObject>(
        &self,
        identity: &Identity,
    ) -> Result<Option<K>, Report<ControlPlaneError>>;

    async fn create<K: ManagedObject>(&self, object: &K) -> Result<K, Report<ControlPlaneError>>;

    /// Replace the stored object with `object` in full.
    async fn replace<K: ManagedObject>(&self, object: &K)
        -> Result<K, Report<ControlPlaneError>>;
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::ServiceSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn service_keeps_allocated_cluster_ip() {
        let current = Service {
            metadata: ObjectMeta {
                resource_version: Some("42".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: Some("10.96.0.12".to_string()),
                cluster_ips: Some(vec!["10.96.0.12".to_string()]),
                ..Default::default()
            }),
            status: None,
        };
        let mut desired = Service {
            spec: Some(ServiceSpec::default()),
            ..Default::default()
        };

        desired.carry_over(&current);

        assert_eq!(desired.metadata.resource_version.as_deref(), Some("42"));
        let spec = desired.spec.expect("spec");
        assert_eq!(spec.cluster_ip.as_deref(), Some("10.96.0.12"));
        assert_eq!(spec.cluster_ips, Some(vec!["10.96.0.12".to_string()]));
    }

    #[test]
    fn deployment_keeps_resource_version_only() {
        let mut current = Deployment::default();
        current.metadata.resource_version = Some("7".to_string());
        current.metadata.labels = Some([("x".to_string(), "y".to_string())].into());

        let mut desired = Deployment::default();
        desired.carry_over(&current);

        assert_eq!(desired.metadata.resource_version.as_deref(), Some("7"));
        assert_eq!(desired.metadata.labels, None);
    }
}
