use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct ReconcilerConfig {
    /// Namespace for desired objects that do not set one.
    /// Env: CPA_RECONCILE_DEFAULT_NAMESPACE
    #[envconfig(from = "CPA_RECONCILE_DEFAULT_NAMESPACE", default = "default")]
    pub default_namespace: String,

    /// Report a create that lost a race ("already exists") as an error
    /// instead of a benign outcome.
    /// Env: CPA_RECONCILE_STRICT_CREATE
    #[envconfig(from = "CPA_RECONCILE_STRICT_CREATE", default = "false")]
    pub strict_create: bool,

    /// Field manager recorded on creates and updates.
    #[envconfig(from = "CPA_RECONCILE_FIELD_MANAGER", default = "cpa-reconcile")]
    pub field_manager: String,

    #[envconfig(from = "CPA_RECONCILE_RACE_REQUEUE_MILLIS", default = "500")]
    pub race_requeue_millis: u64,

    #[envconfig(from = "CPA_RECONCILE_ERROR_REQUEUE_SECS", default = "60")]
    pub error_requeue_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            default_namespace: "default".into(),
            strict_create: false,
            field_manager: "cpa-reconcile".into(),
            race_requeue_millis: 500,
            error_requeue_secs: 60,
        }
    }
}
