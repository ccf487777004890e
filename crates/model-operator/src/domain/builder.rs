//! Desired-state builder
//!
//! Turns a [`ModelDeployment`] into the full `Deployment` and `Service` it should
//! own. Both builders are pure: no I/O, and the same intent always yields the
//! same objects. Owner references are attached separately, see
//! [`crate::domain::ownership`].

use std::collections::BTreeMap;

use api_types::ModelDeployment;
use api_types::ModelDeploymentSpec;
use error_stack::Report;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::core::v1::ServicePort;
use k8s_openapi::api::core::v1::ServiceSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::domain::policy::PolicyError;
use crate::domain::policy::RuntimePolicyTable;

pub const APP_LABEL: &str = "app";
pub const CONTAINER_NAME: &str = "app";
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";
pub const SERVICE_PORT: i32 = 80;
pub const CONTAINER_PORT: i32 = 8000;

/// Labels shared by the pod template, the workload selector and the endpoint selector.
pub fn selector_labels(intent: &ModelDeployment) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), intent.name_any())])
}

/// Serving command: fixed flags, then context length and model name.
pub fn serve_command(spec: &ModelDeploymentSpec) -> Vec<String> {
    vec![
        "vllm".to_string(),
        "serve".to_string(),
        "--dtype".to_string(),
        "auto".to_string(),
        "--max-model-len".to_string(),
        spec.effective_max_model_length().to_string(),
        spec.model_name.clone(),
    ]
}

fn child_metadata(intent: &ModelDeployment) -> ObjectMeta {
    ObjectMeta {
        name: Some(intent.name_any()),
        namespace: intent.namespace(),
        ..Default::default()
    }
}

/// Build the workload that serves the intent's model.
///
/// # Errors
///
/// - [`PolicyError::UnknownRuntime`] if the intent names a runtime without a policy
pub fn build_workload(
    intent: &ModelDeployment,
    policies: &RuntimePolicyTable,
) -> Result<Deployment, Report<PolicyError>> {
    let spec = &intent.spec;
    let policy = policies.resolve(spec.runtime_selector())?;
    let labels = selector_labels(intent);

    let resources = (!policy.limits.is_empty()).then(|| ResourceRequirements {
        limits: Some(policy.limits.clone()),
        ..Default::default()
    });
    let tolerations = (!policy.tolerations.is_empty()).then(|| policy.tolerations.clone());

    Ok(Deployment {
        metadata: child_metadata(intent),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.effective_replicas()),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    node_selector: spec.node_selector_labels.clone(),
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(policy.image.clone()),
                        image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
                        command: Some(serve_command(spec)),
                        resources,
                        ..Default::default()
                    }],
                    tolerations,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    })
}

/// Build the cluster-internal endpoint in front of the workload's pods.
pub fn build_endpoint(intent: &ModelDeployment) -> Service {
    Service {
        metadata: child_metadata(intent),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(selector_labels(intent)),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}
