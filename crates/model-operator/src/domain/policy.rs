//! Runtime policy table
//!
//! Maps the intent's runtime selector to the container image, scheduling
//! tolerations and resource limits used for its workload. The mapping is plain
//! data keyed by [`RuntimeFlavor`]: adding a flavor means adding a variant and
//! its table entry, not another branch in the builder.

use core::error::Error;
use std::collections::BTreeMap;
use std::str::FromStr;

use error_stack::Report;
use k8s_openapi::api::core::v1::Toleration;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

pub const CPU_IMAGE: &str = "patnaikshekhar/vllm-cpu:1";
pub const GPU_IMAGE: &str = "vllm/vllm-openai:latest";
pub const GPU_RESOURCE: &str = "nvidia.com/gpu";

/// Runtime flavors with a policy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RuntimeFlavor {
    #[display("cpu")]
    Cpu,
    #[display("gpu")]
    Gpu,
}

impl FromStr for RuntimeFlavor {
    type Err = PolicyError;

    fn from_str(selector: &str) -> Result<Self, Self::Err> {
        match selector {
            "" | "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(PolicyError::UnknownRuntime {
                selector: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, derive_more::Display)]
pub enum PolicyError {
    #[display("Unknown runtime selector {selector:?}")]
    UnknownRuntime { selector: String },
}

impl Error for PolicyError {}

/// Scheduling and resource shape applied to a workload for one runtime flavor.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimePolicy {
    pub image: String,
    pub tolerations: Vec<Toleration>,
    pub limits: BTreeMap<String, Quantity>,
}

impl RuntimePolicy {
    pub fn cpu(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tolerations: Vec::new(),
            limits: BTreeMap::new(),
        }
    }

    /// One accelerator per replica, schedulable onto nodes tainted for GPUs.
    pub fn gpu(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            tolerations: vec![Toleration {
                key: Some(GPU_RESOURCE.to_string()),
                operator: Some("Exists".to_string()),
                effect: Some("NoSchedule".to_string()),
                ..Default::default()
            }],
            limits: BTreeMap::from([(GPU_RESOURCE.to_string(), Quantity("1".to_string()))]),
        }
    }
}

/// One policy per [`RuntimeFlavor`]; every flavor always has an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimePolicyTable {
    cpu: RuntimePolicy,
    gpu: RuntimePolicy,
}

impl Default for RuntimePolicyTable {
    fn default() -> Self {
        Self::with_images(CPU_IMAGE, GPU_IMAGE)
    }
}

impl RuntimePolicyTable {
    pub fn with_images(cpu_image: impl Into<String>, gpu_image: impl Into<String>) -> Self {
        Self {
            cpu: RuntimePolicy::cpu(cpu_image),
            gpu: RuntimePolicy::gpu(gpu_image),
        }
    }

    pub fn policy(&self, flavor: RuntimeFlavor) -> &RuntimePolicy {
        match flavor {
            RuntimeFlavor::Cpu => &self.cpu,
            RuntimeFlavor::Gpu => &self.gpu,
        }
    }

    /// Resolve a raw runtime selector from an intent.
    ///
    /// # Errors
    ///
    /// - [`PolicyError::UnknownRuntime`] for selectors other than "", "cpu" and "gpu"
    pub fn resolve(&self, selector: &str) -> Result<&RuntimePolicy, Report<PolicyError>> {
        let flavor = selector.parse::<RuntimeFlavor>()?;
        Ok(self.policy(flavor))
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn empty_and_cpu_selectors_share_policy() {
        let table = RuntimePolicyTable::default();

        let empty = table.resolve("").expect("empty selector resolves");
        let cpu = table.resolve("cpu").expect("cpu selector resolves");

        assert_eq!(empty, cpu);
        assert_eq!(cpu.image, CPU_IMAGE);
        assert!(cpu.tolerations.is_empty());
        assert!(cpu.limits.is_empty());
    }

    #[test]
    fn gpu_policy_shape() {
        let table = RuntimePolicyTable::default();
        let gpu = table.resolve("gpu").expect("gpu selector resolves");

        assert_eq!(gpu.image, GPU_IMAGE);
        assert_eq!(gpu.tolerations.len(), 1);
        let toleration = &gpu.tolerations[0];
        assert_eq!(toleration.key.as_deref(), Some("nvidia.com/gpu"));
        assert_eq!(toleration.operator.as_deref(), Some("Exists"));
        assert_eq!(toleration.effect.as_deref(), Some("NoSchedule"));
        assert_eq!(toleration.value, None);
        assert_eq!(
            gpu.limits,
            BTreeMap::from([("nvidia.com/gpu".to_string(), Quantity("1".to_string()))])
        );
    }

    #[test]
    fn unknown_selector_fails() {
        let table = RuntimePolicyTable::default();

        for selector in ["tpu", "GPU", " cpu"] {
            let err = table.resolve(selector).expect_err("selector is not supported");
            assert!(matches!(
                err.current_context(),
                PolicyError::UnknownRuntime { selector: s } if s == selector
            ));
        }
    }

    #[test]
    fn image_overrides() {
        let table = RuntimePolicyTable::with_images("registry.local/cpu:2", "registry.local/gpu:2");

        assert_eq!(table.resolve("cpu").expect("cpu").image, "registry.local/cpu:2");
        assert_eq!(table.resolve("gpu").expect("gpu").image, "registry.local/gpu:2");
    }

    #[test]
    fn selectors_resolve_to_their_flavor_entry() {
        let table = RuntimePolicyTable::with_images("registry.local/cpu:2", "registry.local/gpu:2");

        for (selector, flavor) in [
            ("", RuntimeFlavor::Cpu),
            ("cpu", RuntimeFlavor::Cpu),
            ("gpu", RuntimeFlavor::Gpu),
        ] {
            assert_eq!(
                table.resolve(selector).expect("known selector"),
                table.policy(flavor)
            );
        }
    }
}
