use std::collections::HashMap;

use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// Registry of the kinds a controller knows about, keyed by
/// (apiVersion, kind).
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: HashMap<(String, String), Scope>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(
        mut self,
        api_version: impl Into<String>,
        kind: impl Into<String>,
        scope: Scope,
    ) -> Self {
        self.kinds.insert((api_version.into(), kind.into()), scope);
        self
    }

    pub fn with_namespaced<K>(self) -> Self
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        self.with_kind(K::api_version(&()), K::kind(&()), Scope::Namespaced)
    }

    pub fn with_cluster<K>(self) -> Self
    where
        K: Resource<DynamicType = (), Scope = ClusterResourceScope>,
    {
        self.with_kind(K::api_version(&()), K::kind(&()), Scope::Cluster)
    }

    pub fn scope_of(&self, api_version: &str, kind: &str) -> Option<Scope> {
        self.kinds
            .get(&(api_version.to_string(), kind.to_string()))
            .copied()
    }

    pub fn is_registered(&self, api_version: &str, kind: &str) -> bool {
        self.scope_of(api_version, kind).is_some()
    }
}
