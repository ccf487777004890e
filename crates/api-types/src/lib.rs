//! Shared API type definitions
//!
//! This crate contains the `ModelDeployment` custom resource consumed by the
//! model operator, together with the defaulting rules applied to its spec.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::InstanceType;
use schemars::schema::Schema;
use schemars::schema::SchemaObject;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// API group of the intent resource.
pub const GROUP: &str = "kaimera.ai";
/// API version of the intent resource.
pub const VERSION: &str = "v1";
/// Kind of the intent resource.
pub const KIND: &str = "ModelDeployment";

/// Context length used when `maxModelLength` is unset or not positive.
pub const DEFAULT_MAX_MODEL_LENGTH: i32 = 512;
/// Replica count used when `replicas` is unset or not positive.
pub const MIN_REPLICAS: i32 = 1;

/// Runtime selectors accepted by the schema.
pub const RUNTIME_SELECTORS: [&str; 3] = ["", "cpu", "gpu"];

/// Desired state of a model-serving deployment.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "kaimera.ai",
    version = "v1",
    kind = "ModelDeployment",
    plural = "modeldeployments",
    shortname = "md",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ModelDeploymentSpec {
    /// Model identifier handed to the serving process.
    pub model_name: String,

    /// Requested replica count; zero or unset means one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,

    /// Maximum context length; zero or unset means 512.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub max_model_length: Option<i32>,

    /// Runtime flavor selector: "", "cpu" or "gpu".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "runtime_schema")]
    pub runtime: Option<String>,

    /// Node labels copied verbatim onto the pod node selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector_labels: Option<BTreeMap<String, String>>,
}

impl ModelDeploymentSpec {
    pub fn effective_replicas(&self) -> i32 {
        self.replicas.unwrap_or_default().max(MIN_REPLICAS)
    }

    pub fn effective_max_model_length(&self) -> i32 {
        match self.max_model_length {
            Some(length) if length > 0 => length,
            _ => DEFAULT_MAX_MODEL_LENGTH,
        }
    }

    /// Raw runtime selector, with unset treated as the empty selector.
    pub fn runtime_selector(&self) -> &str {
        self.runtime.as_deref().unwrap_or_default()
    }
}

fn runtime_schema(_: &mut SchemaGenerator) -> Schema {
    Schema::Object(SchemaObject {
        instance_type: Some(InstanceType::String.into()),
        enum_values: Some(RUNTIME_SELECTORS.iter().map(|s| (*s).into()).collect()),
        extensions: [("nullable".to_string(), serde_json::Value::Bool(true))]
            .into_iter()
            .collect(),
        ..Default::default()
    })
}
