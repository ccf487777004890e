use async_trait::async_trait;
use error_stack::Report;
use kube::api::PostParams;
use kube::Api;
use kube::Client;

use crate::domain::error::ControlPlaneError;
use crate::domain::traits::ControlPlane;
use crate::domain::traits::ManagedObject;
use crate::domain::types::Identity;
use crate::domain::types::ObjectKind;

pub const FIELD_MANAGER: &str = "model-operator";

/// [`ControlPlane`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ManagedObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn get<K: ManagedObject>(
        &self,
        identity: &Identity,
    ) -> Result<Option<K>, Report<ControlPlaneError>> {
        self.api::<K>(&identity.namespace)
            .get_opt(&identity.name)
            .await
            .map_err(|e| classify(e, K::KIND, identity))
    }

    async fn create<K: ManagedObject>(&self, object: &K) -> Result<K, Report<ControlPlaneError>> {
        let identity = Identity::of(object)?;
        self.api::<K>(&identity.namespace)
            .create(&Self::post_params(), object)
            .await
            .map_err(|e| classify(e, K::KIND, &identity))
    }

    async fn replace<K: ManagedObject>(
        &self,
        object: &K,
    ) -> Result<K, Report<ControlPlaneError>> {
        let identity = Identity::of(object)?;
        self.api::<K>(&identity.namespace)
            .replace(&identity.name, &Self::post_params(), object)
            .await
            .map_err(|e| classify(e, K::KIND, &identity))
    }
}

/// Map a client error onto the failure classes the dispatcher requeues on.
///
/// 409 covers both a stale `resourceVersion` on replace and an
/// already-existing object on create.
fn classify(err: kube::Error, kind: ObjectKind, identity: &Identity) -> Report<ControlPlaneError> {
    let identity = identity.clone();
    let context = match &err {
        kube::Error::Api(response) if response.code == 409 => {
            ControlPlaneError::Conflict { kind, identity }
        }
        kube::Error::Api(response) => ControlPlaneError::Rejected {
            kind,
            identity,
            code: response.code,
            reason: format!("{}: {}", response.reason, response.message),
        },
        _ => ControlPlaneError::Unavailable { kind, identity },
    };
    Report::new(err).change_context(context)
}
