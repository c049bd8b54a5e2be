use model::RunId;

/// Operator-facing run configuration (§4.7, §6 CLI surface). Mirrors the
/// `migrate` subcommand's flags one-to-one rather than introducing its own
/// vocabulary, so the CLI layer can build this directly from parsed args.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_id: RunId,
    /// `--components`: restrict the run to these (plus their graph position).
    pub components: Option<Vec<String>>,
    /// `migration.component_order` override (§6): reorders named components,
    /// leaves the rest in default relative position.
    pub component_order: Option<Vec<String>>,
    /// `--reset-wp-checkpoints` and friends: components whose checkpoint is
    /// discarded before the run starts, forcing a full replay.
    pub reset_components: Vec<String>,
    /// `--dry-run`: map and validate but never call `ComponentTask::run`'s
    /// Load step. Left to each `ComponentTask` impl to honor; the
    /// orchestrator only threads the flag through.
    pub dry_run: bool,
    /// When false (default), a fatal component error stops the run (§7).
    /// When true, the orchestrator logs it and proceeds to the next
    /// component in topological order.
    pub continue_on_error: bool,
}

impl RunOptions {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            components: None,
            component_order: None,
            reset_components: Vec::new(),
            dry_run: false,
            continue_on_error: false,
        }
    }
}
