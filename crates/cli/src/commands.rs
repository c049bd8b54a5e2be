use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Runs the migration engine against the configured Jira and OpenProject
    /// endpoints (§6 CLI surface).
    Migrate {
        #[arg(long, help = "Path to the YAML config file")]
        config: String,

        #[arg(long, help = "Path to an operator-local .env override file")]
        local_env_file: Option<String>,

        #[arg(long, help = "Path to a team-shared .env file")]
        shared_env_file: Option<String>,

        #[arg(long, value_delimiter = ',', help = "Restrict the run to these components")]
        components: Option<Vec<String>>,

        #[arg(long, value_delimiter = ',', help = "Restrict extraction to these Jira project keys")]
        jira_project_filter: Option<Vec<String>>,

        #[arg(long, value_delimiter = ',', help = "Reset checkpoints for these components before running")]
        reset_wp_checkpoints: Option<Vec<String>>,

        #[arg(long, help = "Requests a dry run; currently recorded in the run summary only, not yet enforced")]
        dry_run: bool,

        #[arg(long, help = "Skip the interactive confirmation before writing to the target")]
        no_confirm: bool,

        #[arg(long, help = "Skip the pre-run OpenProject database backup reminder")]
        no_backup: bool,

        #[arg(long, help = "Continue past a fatal component error instead of stopping the run")]
        continue_on_error: bool,

        #[arg(long, help = "Directory results/ and logs/ are written under", default_value = "./j2o-data")]
        data_dir: String,

        #[arg(
            long,
            help = "Stable run id to resume (§4.5); defaults to one derived from --data-dir so reusing the same data dir resumes automatically"
        )]
        run_id: Option<String>,
    },
    /// Reports durable checkpoint progress for one component of a past run.
    Progress {
        #[arg(long, help = "Run id to inspect")]
        run: String,

        #[arg(long, help = "Component name within the run")]
        component: String,

        #[arg(long, help = "Print the checkpoint as JSON instead of a table")]
        json: bool,
    },
}
