//! Ownership linker
//!
//! Children record their intent as controlling owner so the garbage collector
//! deletes them together with it.

use core::error::Error;

use api_types::ModelDeployment;
use error_stack::Report;
use kube::Resource;

#[derive(Debug, derive_more::Display)]
pub enum OwnershipError {
    #[display("Owner {kind} has no {field}")]
    MissingOwnerField { kind: String, field: &'static str },
}

impl Error for OwnershipError {}

/// Stamp `child` with a controller owner reference to `parent` that also
/// blocks the parent's deletion until the child is gone.
///
/// Any owner references already on `child` are replaced: the builder emits
/// children that belong to exactly one intent.
///
/// # Errors
///
/// - [`OwnershipError::MissingOwnerField`] if the parent was never persisted
///   (no uid) or has no name
pub fn attach_owner<K>(parent: &ModelDeployment, mut child: K) -> Result<K, Report<OwnershipError>>
where
    K: Resource,
{
    let missing = |field| OwnershipError::MissingOwnerField {
        kind: ModelDeployment::kind(&()).to_string(),
        field,
    };
    if parent.meta().uid.is_none() {
        return Err(Report::new(missing("metadata.uid")));
    }
    let mut owner = parent
        .controller_owner_ref(&())
        .ok_or_else(|| Report::new(missing("metadata.name")))?;
    // Foreground deletion of the intent waits for its children.
    owner.block_owner_deletion = Some(true);

    child.meta_mut().owner_references = Some(vec![owner]);
    Ok(child)
}

#[cfg(test)]
mod tests {
    use api_types::ModelDeploymentSpec;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use similar_asserts::assert_eq;

    use super::*;

    fn parent() -> ModelDeployment {
        let mut md = ModelDeployment::new(
            "llama-7b",
            ModelDeploymentSpec {
                model_name: "llama-7b".to_string(),
                ..Default::default()
            },
        );
        md.metadata.namespace = Some("default".to_string());
        md.metadata.uid = Some("0b6f7c1e-5d1a-4c55-9a0c-1f1f1f1f1f1f".to_string());
        md
    }

    #[test]
    fn stamps_controller_reference() {
        let svc = attach_owner(&parent(), Service::default()).expect("owner attached");

        assert_eq!(
            svc.metadata.owner_references,
            Some(vec![OwnerReference {
                api_version: "kaimera.ai/v1".to_string(),
                kind: "ModelDeployment".to_string(),
                name: "llama-7b".to_string(),
                uid: "0b6f7c1e-5d1a-4c55-9a0c-1f1f1f1f1f1f".to_string(),
                controller: Some(true),
                block_owner_deletion: Some(true),
            }])
        );
    }

    #[test]
    fn replaces_foreign_owners() {
        let mut svc = Service::default();
        svc.metadata.owner_references = Some(vec![OwnerReference {
            name: "someone-else".to_string(),
            ..Default::default()
        }]);

        let svc = attach_owner(&parent(), svc).expect("owner attached");
        let owners = svc.metadata.owner_references.expect("owners");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].name, "llama-7b");
    }

    #[test]
    fn unpersisted_parent_fails() {
        let mut md = parent();
        md.metadata.uid = None;

        let err = attach_owner(&md, Service::default()).expect_err("no uid");
        assert!(matches!(
            err.current_context(),
            OwnershipError::MissingOwnerField {
                field: "metadata.uid",
                ..
            }
        ));
    }
}
