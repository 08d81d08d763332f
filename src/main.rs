//! Risk Orchestrator - risk-prioritized test orchestration
//!
//! Runs a test registry in order of risk, records every outcome, and feeds
//! the outcomes back into the risk model that orders the next run.
//!
//! ## Features
//!
//! - Priority from static risk and historical failure rate
//! - Local, containerized and external-project runners
//! - Optional remote prioritization service with local fallback
//! - Run history with JSON and CSV export
//! - CI mode with a non-zero exit on test failures
//!
//! ## Usage
//!
//! ```bash
//! # Register tests
//! risk-orchestrator tests add "Payment Gateway" --file tests/payment.js --risk 9.2
//!
//! # Run the registry in risk order
//! risk-orchestrator run --mode docker
//!
//! # Run a project's suite from CI
//! risk-orchestrator run --project proj_123 --commit "$GITHUB_SHA" --ci
//!
//! # Inspect history
//! risk-orchestrator history list
//! risk-orchestrator history export latest --output run.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod executor;
mod history;
mod http;
mod learning;
mod models;
mod normalizer;
mod orchestrator;
mod output;
mod risk;
mod store;
mod utils;

use cli::Args;
use config::{AppConfig, ConfigFile, EnvConfig, ExecutionMode};
use history::{ExportFormat, History};
use models::{Project, TestCase};
use orchestrator::{ExecuteRequest, Orchestrator, OrchestratorError};
use output::{OutputFormat, ResultFormatter};
use store::{JsonStore, Store};
use utils::LogLevel;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    utils::init_logger(LogLevel::resolve(args.log_level, args.verbose, args.quiet));

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<OrchestratorError>()
                .map(OrchestratorError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let env = EnvConfig::load();

    match args.command {
        cli::Command::Run(ref run_args) => execute(&args, run_args, &env).await,
        cli::Command::History(ref history_args) => {
            manage_history(&args, history_args, &env)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Tests(ref tests_args) => {
            manage_tests(&args, tests_args, &env)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Projects(ref projects_args) => {
            manage_projects(&args, projects_args, &env)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Config(ref config_args) => {
            manage_config(&args, config_args, &env)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Config file chosen by flag, then environment, then search
fn config_path(args: &Args, env: &EnvConfig) -> Option<PathBuf> {
    args.config
        .as_ref()
        .or(env.config_file.as_ref())
        .map(PathBuf::from)
        .or_else(ConfigFile::find)
}

/// Effective configuration: file, then environment, then global flags
fn load_config(args: &Args, env: &EnvConfig) -> Result<AppConfig> {
    let file = match config_path(args, env) {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            ConfigFile::load(&path)?
        }
        None => ConfigFile::default(),
    };

    if env.has_any() {
        debug!("Applying environment overrides");
    }
    let mut config = file.app.with_env(env)?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    Ok(config)
}

fn open_store(config: &AppConfig) -> Result<JsonStore> {
    let path = JsonStore::default_path(config.data_dir.as_deref());
    let store = JsonStore::open(&path)
        .with_context(|| format!("Failed to open registry: {}", path.display()))?;
    if let Some(path) = store.path() {
        debug!("Using registry {}", path.display());
    }
    Ok(store)
}

fn formatter(format: &str) -> Result<ResultFormatter> {
    let format: OutputFormat = format.parse().map_err(anyhow::Error::msg)?;
    let formatter = ResultFormatter::new(format);
    Ok(if std::io::stdout().is_terminal() {
        formatter
    } else {
        formatter.no_color()
    })
}

async fn execute(args: &Args, run_args: &cli::RunArgs, env: &EnvConfig) -> Result<ExitCode> {
    let mut config = load_config(args, env)?;
    if let Some(mode) = &run_args.mode {
        config.execution_mode = ExecutionMode::parse(mode)?;
    }
    if run_args.demo || run_args.ephemeral {
        config.demo_mode = true;
    }
    if let Some(url) = &run_args.risk_service {
        config.risk_service.url = Some(url.clone());
    }
    config.validate()?;

    let request = match &run_args.project {
        Some(project_id) => ExecuteRequest::project(project_id),
        None => ExecuteRequest::registry(),
    }
    .with_commit(
        run_args.commit.clone().or_else(|| env.commit_id.clone()),
        run_args.branch.clone().or_else(|| env.branch.clone()),
    )
    .with_tests(run_args.tests.clone());

    if run_args.ephemeral {
        info!("Ephemeral run: using an in-memory registry, nothing is saved");
        run_cycle(Orchestrator::new(JsonStore::in_memory()), &request, &config, run_args, env).await
    } else {
        run_cycle(Orchestrator::new(open_store(&config)?), &request, &config, run_args, env).await
    }
}

/// Plan or execute one request against a store, then report
async fn run_cycle<S: Store>(
    orchestrator: Orchestrator<S>,
    request: &ExecuteRequest,
    config: &AppConfig,
    run_args: &cli::RunArgs,
    env: &EnvConfig,
) -> Result<ExitCode> {
    let formatter = formatter(&run_args.format)?;

    if run_args.dry_run {
        if request.project_id.is_some() {
            anyhow::bail!("--dry-run applies to registry runs only");
        }
        let planned = orchestrator.plan(request, config).await?;
        println!("{}", formatter.format_plan(&planned));
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        "Starting run: mode={} demo={} service={}",
        config.execution_mode,
        config.demo_mode,
        config.risk_service.url.as_deref().unwrap_or("none")
    );

    let mut rng = match run_args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let summary = orchestrator.execute(request, config, &mut rng).await?;
    println!("{}", formatter.format_run_summary(&summary));

    let ci = run_args.ci || env.ci_or(false);
    if ci {
        println!("{}", output::format_ci_banner(&summary));
        if !summary.all_passed() {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn manage_history(args: &Args, history_args: &cli::HistoryArgs, env: &EnvConfig) -> Result<()> {
    let config = load_config(args, env)?;
    let store = open_store(&config)?;
    let history = History::new(&store);

    let resolve = |id: &str| -> Result<models::RunAggregate> {
        if id == "latest" {
            history
                .latest()?
                .ok_or_else(|| OrchestratorError::RunNotFound(id.to_string()).into())
        } else {
            Ok(history.get_run(id)?)
        }
    };

    match &history_args.action {
        cli::HistoryAction::List {
            project,
            limit,
            format,
        } => {
            let mut runs = history.list_runs(project.as_deref())?;
            if let Some(limit) = limit {
                runs.truncate(*limit);
            }
            println!("{}", formatter(format)?.format_runs(&runs));
        }

        cli::HistoryAction::Show { id, format } => {
            let run = resolve(id)?;
            println!("{}", formatter(format)?.format_run(&run));
        }

        cli::HistoryAction::Export { id, output, format } => {
            let run = resolve(id)?;
            let format = match format {
                Some(f) => f.parse::<ExportFormat>().map_err(anyhow::Error::msg)?,
                None => output
                    .as_deref()
                    .and_then(|p| ExportFormat::from_extension(Path::new(p)))
                    .unwrap_or(ExportFormat::Json),
            };

            match output {
                Some(path) => {
                    history::export(&run, Path::new(path), format)?;
                    eprintln!("✓ Exported run {} to {}", run.id, path);
                }
                None => history::write_run(&run, format, std::io::stdout().lock())?,
            }
        }
    }

    Ok(())
}

fn manage_tests(args: &Args, tests_args: &cli::TestsArgs, env: &EnvConfig) -> Result<()> {
    let config = load_config(args, env)?;
    let store = open_store(&config)?;

    match &tests_args.action {
        cli::TestsAction::Add {
            name,
            file,
            risk,
            project,
        } => {
            if !(0.0..=crate::risk::MAX_SCORE).contains(risk) {
                warn!("Risk {} is outside 0-10 and will be clamped", risk);
            }
            let mut test = TestCase::new(name, file, *risk);
            if let Some(project_id) = project {
                if store.get_project(project_id)?.is_none() {
                    return Err(OrchestratorError::ProjectNotFound(project_id.clone()).into());
                }
                test = test.in_project(project_id);
            }
            let test = store.insert_test(test)?;
            println!("✓ Registered test {} ({})", test.test_name, test.id);
        }

        cli::TestsAction::List {
            project,
            by_priority,
            format,
        } => {
            let mut tests: Vec<TestCase> = store
                .list_tests()?
                .into_iter()
                .filter(|t| project.as_deref().map_or(true, |p| t.belongs_to(p)))
                .collect();
            if *by_priority {
                tests = crate::risk::rank(tests).into_iter().map(|p| p.test).collect();
            }
            println!("{}", formatter(format)?.format_tests(&tests));
        }
    }

    Ok(())
}

fn manage_projects(args: &Args, projects_args: &cli::ProjectsArgs, env: &EnvConfig) -> Result<()> {
    let config = load_config(args, env)?;
    let store = open_store(&config)?;

    match &projects_args.action {
        cli::ProjectsAction::Add {
            name,
            repo,
            path,
            branch,
        } => {
            let mut project = Project::new(name).with_branch(branch);
            if let Some(repo) = repo {
                project = project.with_repo(repo);
            }
            if let Some(path) = path {
                project = project.with_local_path(path);
            }
            let project = store.insert_project(project)?;
            println!("✓ Registered project {} ({})", project.name, project.id);
        }

        cli::ProjectsAction::List { format } => {
            let projects = store.list_projects()?;
            println!("{}", formatter(format)?.format_projects(&projects));
        }

        cli::ProjectsAction::Show { id, format } => {
            let project = store
                .get_project(id)?
                .ok_or_else(|| OrchestratorError::ProjectNotFound(id.clone()))?;
            let tests: Vec<TestCase> = store
                .list_tests()?
                .into_iter()
                .filter(|t| t.belongs_to(id))
                .collect();
            let runs = History::new(&store).list_runs(Some(id))?;

            let formatter = formatter(format)?;
            println!("{}", formatter.format_projects(std::slice::from_ref(&project)));
            println!("{}", formatter.format_tests(&tests));
            println!("{}", formatter.format_runs(&runs));
        }

        cli::ProjectsAction::Delete { id } => {
            if !store.delete_project(id)? {
                return Err(OrchestratorError::ProjectNotFound(id.clone()).into());
            }
            println!("✓ Deleted project {id} and its tests");
        }
    }

    Ok(())
}

fn manage_config(args: &Args, config_args: &cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match &config_args.action {
        cli::ConfigAction::Init { path, force } => {
            let path = path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(ConfigFile::default_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    path.display()
                );
            }

            ConfigFile::example().save(&path)?;
            println!("✓ Configuration file created: {}", path.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { format } => {
            let effective = ConfigFile {
                app: load_config(args, env)?,
                ..ConfigFile::default()
            };
            let output = if format == "json" {
                serde_json::to_string_pretty(&effective)?
            } else {
                serde_yaml::to_string(&effective)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Get { key } => {
            println!("{}", load_config(args, env)?.get(key)?);
        }

        cli::ConfigAction::Set { key, value } => {
            let path = config_path(args, env).unwrap_or_else(ConfigFile::default_path);
            let mut file = if path.exists() {
                ConfigFile::load(&path)?
            } else {
                ConfigFile::default()
            };
            file.set_and_save(key, value, &path)?;
            println!("✓ {} = {} ({})", key, file.app.get(key)?, path.display());
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}
