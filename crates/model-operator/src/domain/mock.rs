//! Test adapters implementing the control plane trait
//!
//! [`MockControlPlane`] keeps objects in memory, records every call, and
//! mimics the API server's optimistic concurrency: creates of existing objects
//! and replaces carrying a stale `resourceVersion` fail with a conflict.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_trait::async_trait;
use error_stack::Report;
use kube::Resource;

use crate::domain::error::ControlPlaneError;
use crate::domain::traits::ControlPlane;
use crate::domain::traits::ManagedObject;
use crate::domain::types::Identity;
use crate::domain::types::ObjectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Create,
    Replace,
}

/// One recorded control plane call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub kind: ObjectKind,
    pub identity: Identity,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(ObjectKind, Identity), serde_json::Value>,
    calls: Vec<Call>,
    failures: HashMap<(Verb, ObjectKind), ControlPlaneError>,
    hangs: HashSet<(Verb, ObjectKind)>,
    resource_version: u64,
}

impl State {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn load<K: ManagedObject>(
        &self,
        identity: &Identity,
    ) -> Result<Option<K>, Report<ControlPlaneError>> {
        self.objects
            .get(&(K::KIND, identity.clone()))
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    Report::new(ControlPlaneError::Rejected {
                        kind: K::KIND,
                        identity: identity.clone(),
                        code: 500,
                        reason: format!("stored object does not decode: {e}"),
                    })
                })
            })
            .transpose()
    }

    fn store<K: ManagedObject>(
        &mut self,
        identity: &Identity,
        mut object: K,
    ) -> Result<K, Report<ControlPlaneError>> {
        object.meta_mut().resource_version = Some(self.next_resource_version());
        let value = serde_json::to_value(&object).map_err(|e| {
            Report::new(ControlPlaneError::Rejected {
                kind: K::KIND,
                identity: identity.clone(),
                code: 422,
                reason: format!("object does not encode: {e}"),
            })
        })?;
        self.objects.insert((K::KIND, identity.clone()), value);
        Ok(object)
    }
}

enum Step<T> {
    Done(T),
    Hang,
}

/// In-memory control plane for tests.
///
/// Clones share the same state, so a test can keep a handle after moving one
/// into a reconciler.
#[derive(Clone, Default)]
pub struct MockControlPlane {
    state: Arc<Mutex<State>>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object without recording a call.
    pub fn insert<K: ManagedObject>(&self, object: K) -> K {
        let identity = Identity::of(&object).expect("mock objects need a name and namespace");
        self.lock()
            .store(&identity, object)
            .expect("mock objects must serialize")
    }

    pub fn remove<K: ManagedObject>(&self, identity: &Identity) {
        self.lock().objects.remove(&(K::KIND, identity.clone()));
    }

    pub fn get_stored<K: ManagedObject>(&self, identity: &Identity) -> Option<K> {
        self.lock()
            .load(identity)
            .expect("stored objects must deserialize")
    }

    /// Make every `verb` on `kind` fail with `error` until [`Self::clear_failures`].
    pub fn fail_on(&self, verb: Verb, kind: ObjectKind, error: ControlPlaneError) {
        self.lock().failures.insert((verb, kind), error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Make every `verb` on `kind` block forever.
    pub fn hang_on(&self, verb: Verb, kind: ObjectKind) {
        self.lock().hangs.insert((verb, kind));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded create and replace calls.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.verb != Verb::Get)
            .collect()
    }

    fn step<T>(
        &self,
        verb: Verb,
        kind: ObjectKind,
        identity: &Identity,
        apply: impl FnOnce(&mut State) -> Result<T, Report<ControlPlaneError>>,
    ) -> Step<Result<T, Report<ControlPlaneError>>> {
        let mut state = self.lock();
        state.calls.push(Call {
            verb,
            kind,
            identity: identity.clone(),
        });
        if state.hangs.contains(&(verb, kind)) {
            return Step::Hang;
        }
        if let Some(error) = state.failures.get(&(verb, kind)) {
            return Step::Done(Err(Report::new(error.clone())));
        }
        Step::Done(apply(&mut state))
    }
}

async fn settle<T>(step: Step<T>) -> T {
    match step {
        Step::Done(result) => result,
        Step::Hang => std::future::pending().await,
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn get<K: ManagedObject>(
        &self,
        identity: &Identity,
    ) -> Result<Option<K>, Report<ControlPlaneError>> {
        let step = self.step(Verb::Get, K::KIND, identity, |state| state.load(identity));
        settle(step).await
    }

    async fn create<K: ManagedObject>(&self, object: &K) -> Result<K, Report<ControlPlaneError>> {
        let identity = Identity::of(object)?;
        let step = self.step(Verb::Create, K::KIND, &identity, |state| {
            if state.objects.contains_key(&(K::KIND, identity.clone())) {
                return Err(Report::new(ControlPlaneError::Conflict {
                    kind: K::KIND,
                    identity: identity.clone(),
                }));
            }
            state.store(&identity, object.clone())
        });
        settle(step).await
    }

    async fn replace<K: ManagedObject>(
        &self,
        object: &K,
    ) -> Result<K, Report<ControlPlaneError>> {
        let identity = Identity::of(object)?;
        let step = self.step(Verb::Replace, K::KIND, &identity, |state| {
            let Some(current) = state.load::<K>(&identity)? else {
                return Err(Report::new(ControlPlaneError::Rejected {
                    kind: K::KIND,
                    identity: identity.clone(),
                    code: 404,
                    reason: "NotFound".to_string(),
                }));
            };
            if current.meta().resource_version != object.meta().resource_version {
                return Err(Report::new(ControlPlaneError::Conflict {
                    kind: K::KIND,
                    identity: identity.clone(),
                }));
            }
            state.store(&identity, object.clone())
        });
        settle(step).await
    }
}
