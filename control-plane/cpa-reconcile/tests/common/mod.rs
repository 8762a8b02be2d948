#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use cpa_reconcile::{
    CallContext, ClientError, ClusterClient, ObjectKey, Owner, Scheme, Scope,
};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use kube::core::ObjectMeta;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(ObjectKey),
    Create(ObjectKey),
    Update(ObjectKey),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Get(_))
    }
}

/// In-memory object store for `ServiceAccount`s with resourceVersion based
/// optimistic concurrency.
#[derive(Default)]
pub struct InMemoryCluster {
    objects: Mutex<HashMap<ObjectKey, ServiceAccount>>,
    calls: Mutex<Vec<Call>>,
    next_version: AtomicU64,
    fail_get: Mutex<Option<ClientError>>,
    fail_create: Mutex<Option<ClientError>>,
    fail_update: Mutex<Option<ClientError>>,
    // Simulates another writer touching the object right after our read.
    bump_after_get: AtomicBool,
    stall_get: AtomicBool,
    stall_create: AtomicBool,
    stall_update: AtomicBool,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    // Like the API server, writes are addressed by the object's own
    // namespace; there is no fallback.
    fn key_of(obj: &ServiceAccount) -> Result<ObjectKey, ClientError> {
        match obj.namespace().filter(|ns| !ns.is_empty()) {
            Some(ns) => Ok(ObjectKey::new("ServiceAccount", ns, obj.name_any())),
            None => Err(ClientError::Invalid(format!(
                "ServiceAccount {} has no metadata.namespace",
                obj.name_any()
            ))),
        }
    }

    fn bump(&self, obj: &mut ServiceAccount) {
        let v = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        obj.metadata.resource_version = Some(v.to_string());
    }

    /// Store an object directly, bypassing call recording.
    pub async fn seed(&self, mut obj: ServiceAccount) {
        self.bump(&mut obj);
        let key = Self::key_of(&obj).expect("seeded objects carry a namespace");
        self.objects.lock().await.insert(key, obj);
    }

    pub async fn object(&self, ns: &str, name: &str) -> Option<ServiceAccount> {
        self.objects
            .lock()
            .await
            .get(&ObjectKey::new("ServiceAccount", ns, name))
            .cloned()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn writes(&self) -> usize {
        self.calls.lock().await.iter().filter(|c| c.is_write()).count()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    pub async fn fail_get_with(&self, err: ClientError) {
        *self.fail_get.lock().await = Some(err);
    }

    pub async fn fail_create_with(&self, err: ClientError) {
        *self.fail_create.lock().await = Some(err);
    }

    pub async fn fail_update_with(&self, err: ClientError) {
        *self.fail_update.lock().await = Some(err);
    }

    pub fn bump_after_get(&self, on: bool) {
        self.bump_after_get.store(on, Ordering::SeqCst);
    }

    pub fn stall_get(&self, on: bool) {
        self.stall_get.store(on, Ordering::SeqCst);
    }

    /// Writes hang before touching the store until the call is aborted.
    pub fn stall_create(&self, on: bool) {
        self.stall_create.store(on, Ordering::SeqCst);
    }

    pub fn stall_update(&self, on: bool) {
        self.stall_update.store(on, Ordering::SeqCst);
    }

    /// Wait until `pred` has matched a recorded call.
    pub async fn wait_for_call(&self, pred: impl Fn(&Call) -> bool) {
        while !self.calls.lock().await.iter().any(&pred) {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ClusterClient<ServiceAccount> for InMemoryCluster {
    async fn get(
        &self,
        ctx: &CallContext,
        key: &ObjectKey,
    ) -> Result<ServiceAccount, ClientError> {
        self.calls.lock().await.push(Call::Get(key.clone()));
        ctx.run(async {
            if self.stall_get.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(err) = self.fail_get.lock().await.take() {
                return Err(err);
            }
            let mut objects = self.objects.lock().await;
            let Some(snapshot) = objects.get(key).cloned() else {
                return Err(ClientError::NotFound);
            };
            if self.bump_after_get.load(Ordering::SeqCst) {
                if let Some(stored) = objects.get_mut(key) {
                    self.bump(stored);
                }
            }
            Ok(snapshot)
        })
        .await?
    }

    async fn create(
        &self,
        ctx: &CallContext,
        obj: &ServiceAccount,
    ) -> Result<(), ClientError> {
        let key = Self::key_of(obj)?;
        self.calls.lock().await.push(Call::Create(key.clone()));
        ctx.run(async {
            if self.stall_create.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(err) = self.fail_create.lock().await.take() {
                return Err(err);
            }
            let mut objects = self.objects.lock().await;
            if objects.contains_key(&key) {
                return Err(ClientError::AlreadyExists);
            }
            let mut stored = obj.clone();
            stored.metadata.uid = Some(format!("uid-{}", key.name));
            self.bump(&mut stored);
            objects.insert(key, stored);
            Ok(())
        })
        .await?
    }

    async fn update(
        &self,
        ctx: &CallContext,
        obj: &ServiceAccount,
    ) -> Result<(), ClientError> {
        let key = Self::key_of(obj)?;
        self.calls.lock().await.push(Call::Update(key.clone()));
        ctx.run(async {
            if self.stall_update.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(err) = self.fail_update.lock().await.take() {
                return Err(err);
            }
            let mut objects = self.objects.lock().await;
            let Some(current) = objects.get(&key) else {
                return Err(ClientError::NotFound);
            };
            if current.metadata.resource_version
                != obj.metadata.resource_version
            {
                return Err(ClientError::Conflict);
            }
            let mut stored = obj.clone();
            self.bump(&mut stored);
            objects.insert(key, stored);
            Ok(())
        })
        .await?
    }
}

pub fn scaler() -> Owner {
    Owner::new("v1", "Scaler", "my-scaler")
        .with_uid("abc")
        .with_namespace("default")
}

pub fn scheme() -> Scheme {
    Scheme::new()
        .with_kind("v1", "Scaler", Scope::Namespaced)
        .with_namespaced::<ServiceAccount>()
}

pub fn service_account(name: &str, ns: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(ns.into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn foreign_ref(kind: &str, name: &str) -> OwnerReference {
    OwnerReference {
        api_version: "apps/v1".into(),
        kind: kind.into(),
        name: name.into(),
        uid: format!("{name}-uid"),
        controller: None,
        block_owner_deletion: None,
    }
}
