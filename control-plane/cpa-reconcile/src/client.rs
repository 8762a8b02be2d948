use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::child::{ChildObject, ObjectKey};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict: object has been modified")]
    Conflict,
    #[error("api error {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },
    #[error("call cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("transport: {0}")]
    Transport(String),
    /// The object cannot be addressed; nothing was sent.
    #[error("invalid object: {0}")]
    Invalid(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict)
    }
}

impl From<kube::Error> for ClientError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) => match ae.code {
                404 => ClientError::NotFound,
                409 if ae.reason == "AlreadyExists" => {
                    ClientError::AlreadyExists
                }
                409 => ClientError::Conflict,
                code => ClientError::Api {
                    code,
                    reason: ae.reason,
                    message: ae.message,
                },
            },
            kube::Error::SerdeError(e) => {
                ClientError::Serialization(e.to_string())
            }
            other => ClientError::Transport(other.to_string()),
        }
    }
}

/// Cancellation and deadline for the cluster calls of one reconcile pass.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// No deadline, never cancelled unless the token is.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the current and the given deadline.
    pub fn with_deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(at),
            None => at,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes, the token fires or the deadline
    /// passes, whichever comes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ClientError>
    where
        F: Future,
    {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
                out = fut => Ok(out),
            }
        };
        match self.deadline {
            Some(at) => tokio::time::timeout_at(at, guarded)
                .await
                .unwrap_or(Err(ClientError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}

/// Get/Create/Update against the cluster's object store.
#[async_trait]
pub trait ClusterClient<K: ChildObject>: Send + Sync {
    async fn get(
        &self,
        ctx: &CallContext,
        key: &ObjectKey,
    ) -> Result<K, ClientError>;

    async fn create(
        &self,
        ctx: &CallContext,
        obj: &K,
    ) -> Result<(), ClientError>;

    async fn update(
        &self,
        ctx: &CallContext,
        obj: &K,
    ) -> Result<(), ClientError>;
}

/// `ClusterClient` backed by the API server through `kube::Api`.
///
/// Objects are addressed exactly as given: the namespace comes from the key
/// or from `metadata.namespace`, and an object without one is rejected.
pub struct KubeClusterClient<K> {
    client: Client,
    field_manager: String,
    _marker: PhantomData<fn() -> K>,
}

impl<K> KubeClusterClient<K> {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _marker: PhantomData,
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

impl<K> fmt::Debug for KubeClusterClient<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("field_manager", &self.field_manager)
            .finish()
    }
}

impl<K> KubeClusterClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    fn api_for(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn name_of<K: ChildObject>(obj: &K) -> Result<&str, ClientError> {
    obj.child_name()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ClientError::Invalid(format!(
                "{} has no metadata.name",
                obj.child_kind()
            ))
        })
}

fn namespace_of<K: ChildObject>(obj: &K) -> Result<&str, ClientError> {
    obj.child_namespace()
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| {
            ClientError::Invalid(format!(
                "{} {} has no metadata.namespace",
                obj.child_kind(),
                obj.child_name().unwrap_or_default()
            ))
        })
}

#[async_trait]
impl<K> ClusterClient<K> for KubeClusterClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Serialize
        + DeserializeOwned
        + Clone
        + fmt::Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(
        &self,
        ctx: &CallContext,
        key: &ObjectKey,
    ) -> Result<K, ClientError> {
        trace!(%key, "get");
        let api = self.api_for(&key.namespace);
        Ok(ctx.run(api.get(&key.name)).await??)
    }

    async fn create(
        &self,
        ctx: &CallContext,
        obj: &K,
    ) -> Result<(), ClientError> {
        let api = self.api_for(namespace_of(obj)?);
        let pp = self.post_params();
        ctx.run(api.create(&pp, obj)).await??;
        Ok(())
    }

    async fn update(
        &self,
        ctx: &CallContext,
        obj: &K,
    ) -> Result<(), ClientError> {
        let name = name_of(obj)?;
        let api = self.api_for(namespace_of(obj)?);
        let pp = self.post_params();
        ctx.run(api.replace(name, &pp, obj)).await??;
        Ok(())
    }
}
