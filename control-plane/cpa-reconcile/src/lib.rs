pub mod child;
pub mod client;
pub mod config;
pub mod error;
pub mod owner;
pub mod ownership;
pub mod reconcile;
pub mod scheme;

pub use child::{ChildObject, ObjectKey};
pub use client::{CallContext, ClientError, ClusterClient, KubeClusterClient};
pub use config::ReconcilerConfig;
pub use error::{ErrorClass, LinkError, ReconcileError};
pub use owner::Owner;
pub use ownership::{ControllerLinker, OwnershipLinker, with_owner_reference};
pub use reconcile::{Outcome, ResourceReconciler};
pub use scheme::{Scheme, Scope};

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init_tracing(default_env: &str) {
    let filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .from_env_lossy()
        .add_directive(
            default_env
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        );

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}
