use crate::child::ObjectKey;
use crate::client::ClientError;

/// How the invoking queue should treat a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retrying with the same inputs cannot succeed.
    Fatal,
    /// Worth another pass, with backoff.
    Transient,
}

/// Failures of the controller-reference linking step.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("owner is missing {0}")]
    IncompleteOwner(&'static str),
    #[error("kind {kind} ({api_version}) is not registered in the scheme")]
    Unregistered { api_version: String, kind: String },
    #[error(
        "cluster-scoped {child_kind} cannot be owned by namespaced {owner_kind}"
    )]
    ClusterScopedChild {
        child_kind: String,
        owner_kind: String,
    },
    #[error(
        "cross-namespace owner references are disallowed: owner in {owner_namespace}, object in {child_namespace}"
    )]
    CrossNamespace {
        owner_namespace: String,
        child_namespace: String,
    },
    #[error("object is already controlled by {kind} {name}")]
    AlreadyControlled { kind: String, name: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to set owner reference: {0}")]
    Link(#[from] LinkError),
    #[error("failed to get {key}: {source}")]
    Lookup {
        key: ObjectKey,
        #[source]
        source: ClientError,
    },
    #[error("failed to create {key}: {source}")]
    Create {
        key: ObjectKey,
        #[source]
        source: ClientError,
    },
    #[error("failed to update {key}: {source}")]
    Update {
        key: ObjectKey,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcileError::InvalidInput(_) | ReconcileError::Link(_) => {
                ErrorClass::Fatal
            }
            ReconcileError::Lookup { .. }
            | ReconcileError::Create { .. }
            | ReconcileError::Update { .. } => ErrorClass::Transient,
        }
    }

    pub fn requeue(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// The cluster error behind a lookup/create/update failure.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            ReconcileError::Lookup { source, .. }
            | ReconcileError::Create { source, .. }
            | ReconcileError::Update { source, .. } => Some(source),
            _ => None,
        }
    }
}
