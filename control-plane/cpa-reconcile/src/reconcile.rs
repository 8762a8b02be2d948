use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use tracing::{debug, info, instrument, trace, warn};

use crate::child::{ChildObject, ObjectKey};
use crate::client::{CallContext, ClusterClient};
use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;
use crate::owner::Owner;
use crate::ownership::{ControllerLinker, OwnershipLinker, with_owner_reference};
use crate::scheme::{Scheme, Scope};

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The object was absent and has been created with the owner reference.
    Created,
    /// Create lost a race with another writer; the next pass will find the
    /// object and check its owner references.
    CreateRaced,
    /// The object existed without the owner; the reference was appended.
    OwnershipRepaired,
    /// Nothing to do.
    AlreadyOwned,
}

impl Outcome {
    pub fn requeue(&self) -> bool {
        matches!(self, Outcome::CreateRaced)
    }

    pub fn wrote(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::OwnershipRepaired)
    }
}

/// Makes sure a desired child object exists and is owned by its parent.
///
/// Stateless between calls: every pass re-reads the live object, performs
/// at most one write, and leaves retries to the caller.
pub struct ResourceReconciler<C: ?Sized, L = ControllerLinker> {
    client: Arc<C>,
    linker: L,
    scheme: Arc<Scheme>,
    cfg: ReconcilerConfig,
}

impl<C: ?Sized, L: Clone> Clone for ResourceReconciler<C, L> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            linker: self.linker.clone(),
            scheme: self.scheme.clone(),
            cfg: self.cfg.clone(),
        }
    }
}

impl<C: ?Sized> ResourceReconciler<C, ControllerLinker> {
    pub fn new(
        client: Arc<C>,
        scheme: Arc<Scheme>,
        cfg: ReconcilerConfig,
    ) -> Self {
        Self {
            client,
            linker: ControllerLinker,
            scheme,
            cfg,
        }
    }
}

impl<C: ?Sized, L> ResourceReconciler<C, L> {
    pub fn with_linker<L2: OwnershipLinker>(
        self,
        linker: L2,
    ) -> ResourceReconciler<C, L2> {
        ResourceReconciler {
            client: self.client,
            linker,
            scheme: self.scheme,
            cfg: self.cfg,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.cfg
    }

    /// Controller action for the result of a pass.
    pub fn requeue_action(
        &self,
        result: &Result<Outcome, ReconcileError>,
    ) -> Action {
        match result {
            Ok(outcome) if outcome.requeue() => Action::requeue(
                Duration::from_millis(self.cfg.race_requeue_millis),
            ),
            Ok(_) => Action::await_change(),
            Err(e) if e.requeue() => {
                Action::requeue(Duration::from_secs(self.cfg.error_requeue_secs))
            }
            Err(_) => Action::await_change(),
        }
    }

    #[instrument(skip_all, fields(
        owner = %owner.name,
        kind = %desired.child_kind(),
        name = desired.child_name().unwrap_or_default(),
    ))]
    pub async fn reconcile<K>(
        &self,
        ctx: &CallContext,
        owner: &Owner,
        mut desired: K,
    ) -> Result<Outcome, ReconcileError>
    where
        K: ChildObject,
        C: ClusterClient<K>,
        L: OwnershipLinker,
    {
        let key = ObjectKey::of(&desired, &self.cfg.default_namespace)?;
        let ns = key.namespace.as_str();
        let name = key.name.as_str();

        // The resolved namespace must be on the object itself so the linker
        // and the client both see the identity the lookup uses.
        let namespaced = self
            .scheme
            .scope_of(&desired.child_api_version(), &desired.child_kind())
            == Some(Scope::Namespaced);
        if namespaced && desired.child_namespace() != Some(ns) {
            desired.set_child_namespace(key.namespace.clone());
        }

        self.linker.link(owner, &mut desired, &self.scheme)?;

        trace!(%ns, %name, "looking up object");
        let live = match self.client.get(ctx, &key).await {
            Ok(live) => live,
            Err(e) if e.is_not_found() => {
                info!(%ns, %name, "creating a new object");
                return match self.client.create(ctx, &desired).await {
                    Ok(()) => Ok(Outcome::Created),
                    Err(e) if e.is_already_exists() && !self.cfg.strict_create => {
                        warn!(%ns, %name, "object appeared concurrently; will recheck ownership");
                        Ok(Outcome::CreateRaced)
                    }
                    Err(source) => Err(ReconcileError::Create { key, source }),
                };
            }
            Err(source) => return Err(ReconcileError::Lookup { key, source }),
        };

        if live.owner_refs().iter().any(|r| owner.matches(r)) {
            debug!(%ns, %name, "skip: object already exists with expected owner");
            return Ok(Outcome::AlreadyOwned);
        }

        info!(%ns, %name, owner = %owner.name, "owner not set; updating owner references");
        let mut live = live;
        let refs = with_owner_reference(live.owner_refs(), owner);
        live.set_owner_refs(refs);
        match self.client.update(ctx, &live).await {
            Ok(()) => Ok(Outcome::OwnershipRepaired),
            Err(source) => Err(ReconcileError::Update { key, source }),
        }
    }
}
