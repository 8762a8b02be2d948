use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use crate::error::ReconcileError;

/// The parent object a child is reconciled on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Option<String>,
    pub namespace: Option<String>,
}

impl Owner {
    /// Owner without a UID. The API server rejects owner references whose
    /// uid is empty, so against a real cluster set one with [`Owner::with_uid`]
    /// or build the owner with [`Owner::from_resource`].
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            uid: None,
            namespace: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Owner taken from a live typed resource, e.g. the custom resource
    /// handed to a controller's reconcile callback.
    pub fn from_resource<K>(obj: &K) -> Result<Self, ReconcileError>
    where
        K: Resource<DynamicType = ()>,
    {
        let meta = obj.meta();
        let name = meta.name.clone().ok_or_else(|| {
            ReconcileError::InvalidInput(format!(
                "owner {} has no metadata.name",
                K::kind(&())
            ))
        })?;
        Ok(Self {
            api_version: K::api_version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            name,
            uid: meta.uid.clone(),
            namespace: meta.namespace.clone(),
        })
    }

    /// Plain (non-controller) reference to this owner. The uid is left empty
    /// when the owner has none.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            uid: self.uid.clone().unwrap_or_default(),
            controller: None,
            block_owner_deletion: None,
        }
    }

    pub fn controller_reference(&self) -> OwnerReference {
        OwnerReference {
            controller: Some(true),
            block_owner_deletion: Some(true),
            ..self.owner_reference()
        }
    }

    /// Membership test: apiVersion, kind and name must agree; uid is not
    /// compared.
    pub fn matches(&self, r: &OwnerReference) -> bool {
        r.api_version == self.api_version
            && r.kind == self.kind
            && r.name == self.name
    }
}
