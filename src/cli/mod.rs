//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

use crate::utils::LogLevel;

/// Risk-prioritized test orchestration
#[derive(Parser, Debug)]
#[command(name = "risk-orchestrator")]
#[command(version)]
#[command(about = "Run tests in risk order and learn from every outcome")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error); overrides -v and -q
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Configuration file (default: search standard locations)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Directory holding the registry
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prioritize and execute tests
    Run(RunArgs),

    /// Browse and export past runs
    History(HistoryArgs),

    /// Manage the test registry
    Tests(TestsArgs),

    /// Manage external projects
    Projects(ProjectsArgs),

    /// Show and edit configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Run a project's discovered suite instead of the registry
    #[arg(short, long)]
    pub project: Option<String>,

    /// Commit being tested (project runs)
    #[arg(long)]
    pub commit: Option<String>,

    /// Branch being tested (project runs)
    #[arg(long)]
    pub branch: Option<String>,

    /// Run only these test ids (repeatable)
    #[arg(short, long = "test")]
    pub tests: Vec<String>,

    /// Override the execution mode (local, docker)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Enable demo mode for this run
    #[arg(long)]
    pub demo: bool,

    /// Use a throwaway in-memory registry; implies --demo
    #[arg(long)]
    pub ephemeral: bool,

    /// Risk service base URL for this run
    #[arg(long)]
    pub risk_service: Option<String>,

    /// Seed for reproducible outcomes
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print a CI summary and exit non-zero on failures
    #[arg(long)]
    pub ci: bool,

    /// Show the execution order without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List runs, newest first
    List {
        /// Only runs for this project
        #[arg(short, long)]
        project: Option<String>,

        /// Show at most this many runs
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show one run with every result
    Show {
        /// Run id, or "latest"
        id: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Export a run to JSON or CSV
    Export {
        /// Run id, or "latest"
        id: String,

        /// Destination file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Export format (json, csv); inferred from the file extension by default
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Arguments for tests command
#[derive(Parser, Debug)]
pub struct TestsArgs {
    #[command(subcommand)]
    pub action: TestsAction,
}

#[derive(Subcommand, Debug)]
pub enum TestsAction {
    /// Register a test
    Add {
        /// Test name
        name: String,

        /// Source file of the test
        #[arg(long)]
        file: String,

        /// Static risk on the 0-10 scale
        #[arg(short, long, default_value = "5.0")]
        risk: f64,

        /// Scope the test to a project
        #[arg(short, long)]
        project: Option<String>,
    },

    /// List registered tests
    List {
        /// Only tests scoped to this project
        #[arg(short, long)]
        project: Option<String>,

        /// Sort by current priority instead of registration order
        #[arg(long)]
        by_priority: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

/// Arguments for projects command
#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub action: ProjectsAction,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsAction {
    /// Register a project
    Add {
        /// Project name
        name: String,

        /// Repository URL
        #[arg(long)]
        repo: Option<String>,

        /// Local checkout path
        #[arg(long)]
        path: Option<String>,

        /// Branch to sync
        #[arg(short, long, default_value = "main")]
        branch: String,
    },

    /// List projects
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show a project with its tests
    Show {
        /// Project id
        id: String,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Delete a project and its tests
    Delete {
        /// Project id
        id: String,
    },
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Destination (default: ~/.config/risk-orchestrator/config.yaml)
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Print one configuration value
    Get {
        /// Key, e.g. execution_mode or risk_service.url
        key: String,
    },

    /// Update one configuration value
    Set {
        /// Key, e.g. execution_mode or risk_service.url
        key: String,

        /// New value
        value: String,
    },

    /// Describe supported environment variables
    Env,
}
