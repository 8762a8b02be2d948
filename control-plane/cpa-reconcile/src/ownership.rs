use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

use crate::child::ChildObject;
use crate::error::LinkError;
use crate::owner::Owner;
use crate::scheme::{Scheme, Scope};

/// Declares `owner` as the controller of `child`, in memory only.
pub trait OwnershipLinker: Send + Sync {
    fn link<K: ChildObject>(
        &self,
        owner: &Owner,
        child: &mut K,
        scheme: &Scheme,
    ) -> Result<(), LinkError>;
}

/// Controller-reference rules as enforced by the API server's garbage
/// collector: both kinds known, no cross-namespace ownership, and at most
/// one controller per object.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerLinker;

impl OwnershipLinker for ControllerLinker {
    fn link<K: ChildObject>(
        &self,
        owner: &Owner,
        child: &mut K,
        scheme: &Scheme,
    ) -> Result<(), LinkError> {
        if owner.api_version.is_empty() {
            return Err(LinkError::IncompleteOwner("apiVersion"));
        }
        if owner.kind.is_empty() {
            return Err(LinkError::IncompleteOwner("kind"));
        }
        if owner.name.is_empty() {
            return Err(LinkError::IncompleteOwner("name"));
        }

        let owner_scope = registered_scope(scheme, &owner.api_version, &owner.kind)?;
        let child_kind = child.child_kind();
        let child_scope =
            registered_scope(scheme, &child.child_api_version(), &child_kind)?;

        if owner_scope == Scope::Namespaced {
            if child_scope == Scope::Cluster {
                return Err(LinkError::ClusterScopedChild {
                    child_kind,
                    owner_kind: owner.kind.clone(),
                });
            }
            if let (Some(owner_ns), Some(child_ns)) =
                (owner.namespace.as_deref(), child.child_namespace())
            {
                if owner_ns != child_ns {
                    return Err(LinkError::CrossNamespace {
                        owner_namespace: owner_ns.to_string(),
                        child_namespace: child_ns.to_string(),
                    });
                }
            }
        }

        let desired = owner.controller_reference();
        if let Some(existing) = child
            .owner_refs()
            .iter()
            .find(|r| r.controller == Some(true) && !same_owner(r, &desired))
        {
            return Err(LinkError::AlreadyControlled {
                kind: existing.kind.clone(),
                name: existing.name.clone(),
            });
        }

        let refs = upsert_reference(child.owner_refs(), desired);
        child.set_owner_refs(refs);
        Ok(())
    }
}

fn registered_scope(
    scheme: &Scheme,
    api_version: &str,
    kind: &str,
) -> Result<Scope, LinkError> {
    scheme
        .scope_of(api_version, kind)
        .ok_or_else(|| LinkError::Unregistered {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
        })
}

/// API group of an apiVersion: "apps/v1" -> "apps", "v1" -> "".
fn api_group(api_version: &str) -> &str {
    api_version
        .rsplit_once('/')
        .map(|(group, _)| group)
        .unwrap_or("")
}

// Same group/kind/name; the version may differ across API upgrades.
fn same_owner(a: &OwnerReference, b: &OwnerReference) -> bool {
    api_group(&a.api_version) == api_group(&b.api_version)
        && a.kind == b.kind
        && a.name == b.name
}

fn upsert_reference(
    refs: &[OwnerReference],
    desired: OwnerReference,
) -> Vec<OwnerReference> {
    let mut out = refs.to_vec();
    match out.iter_mut().find(|r| same_owner(r, &desired)) {
        Some(slot) => *slot = desired,
        None => out.push(desired),
    }
    out
}

/// `refs` with a plain reference to `owner` appended, unless one matching
/// the owner's apiVersion, kind and name is already present. Existing
/// entries keep their order.
pub fn with_owner_reference(
    refs: &[OwnerReference],
    owner: &Owner,
) -> Vec<OwnerReference> {
    let mut out = refs.to_vec();
    if !refs.iter().any(|r| owner.matches(r)) {
        out.push(owner.owner_reference());
    }
    out
}
