use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use serde::Serialize;

use crate::error::ReconcileError;

/// What the reconciler needs from a child object: identity, owner
/// references, and a wire representation for the API server.
///
/// Every typed `kube::Resource` gets this for free.
pub trait ChildObject: Clone + fmt::Debug + Send + Sync + 'static {
    fn child_api_version(&self) -> String;
    fn child_kind(&self) -> String;
    fn child_name(&self) -> Option<&str>;
    fn child_namespace(&self) -> Option<&str>;
    fn set_child_namespace(&mut self, namespace: String);
    fn owner_refs(&self) -> &[OwnerReference];
    fn set_owner_refs(&mut self, refs: Vec<OwnerReference>);
    fn to_wire(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<K> ChildObject for K
where
    K: Resource<DynamicType = ()>
        + Serialize
        + Clone
        + fmt::Debug
        + Send
        + Sync
        + 'static,
{
    fn child_api_version(&self) -> String {
        K::api_version(&()).into_owned()
    }

    fn child_kind(&self) -> String {
        K::kind(&()).into_owned()
    }

    fn child_name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }

    fn child_namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref()
    }

    fn set_child_namespace(&mut self, namespace: String) {
        self.meta_mut().namespace = Some(namespace);
    }

    fn owner_refs(&self) -> &[OwnerReference] {
        self.meta().owner_references.as_deref().unwrap_or_default()
    }

    fn set_owner_refs(&mut self, refs: Vec<OwnerReference>) {
        self.meta_mut().owner_references = Some(refs);
    }

    fn to_wire(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Identity of an object in the cluster's object space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for `obj`; an unset namespace falls back to `default_namespace`.
    pub fn of<K: ChildObject>(
        obj: &K,
        default_namespace: &str,
    ) -> Result<Self, ReconcileError> {
        let kind = obj.child_kind();
        let name = obj
            .child_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ReconcileError::InvalidInput(format!(
                    "desired {kind} has no metadata.name"
                ))
            })?
            .to_string();
        let namespace = obj
            .child_namespace()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(default_namespace)
            .to_string();
        Ok(Self {
            kind,
            namespace,
            name,
        })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
