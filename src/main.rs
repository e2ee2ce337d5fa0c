//! Upgrade pilot CLI entrypoint.
//!
//! This is the main entrypoint for the upgrade-pilot command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use upgrade_pilot::cli::{Cli, Commands, LogFormat, OutputFormatter};
use upgrade_pilot::config::{ConfigParser, ConfigValidator, UpgradeConfig, find_config_file};
use upgrade_pilot::error::Result;
use upgrade_pilot::executor::{CompletionMonitor, ScriptExecutor};
use upgrade_pilot::package::CachedResolver;
use upgrade_pilot::tools::{AdapterTool, CliPackageManager};
use upgrade_pilot::upgrade::{UpgradeOptions, UpgradeRunner};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Configuration written by `init`.
const CONFIG_TEMPLATE: &str = r"# upgrade-pilot configuration

package:
  # Root package of the family to upgrade.
  id: Telerik.Sitefinity.All
  # A reference belongs to the family when it contains one of these keywords
  # and the public key token below.
  reference_keywords:
    - Telerik.Sitefinity
    - Progress.Sitefinity
  public_key_token: b28c218413bdf563

tools:
  # Answers tree, projects, references, packages and rewrite requests in JSON.
  adapter:
    program: upgrade-adapter
    args: []
  package_manager: nuget
  # package_manager_config: NuGet.Config

executor:
  # Automation host running the updater script.
  host:
    program: pwsh
    args: [-NoProfile, -File]
  script: Updater.ps1
  # Holds upgrade-config.json, progress.log and result.log.
  work_dir: .upgrade-pilot
  poll_interval_ms: 500
  max_wait_secs: 3600
  success_token: success

cache:
  enabled: true

projects:
  project_extension: .csproj
  solution_extension: .sln
";

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Plan {
            solution,
            target_version,
        } => cmd_plan(cli.config.as_ref(), &solution, &target_version, &formatter).await,
        Commands::Upgrade {
            solution,
            target_version,
            yes,
            skip_sync,
        } => {
            cmd_upgrade(
                cli.config.as_ref(),
                &solution,
                &target_version,
                yes,
                UpgradeOptions { skip_sync },
                &formatter,
            )
            .await
        }
        Commands::Wait => cmd_wait(cli.config.as_ref(), &formatter).await,
    }
}

/// Write a configuration template.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing upgrade-pilot configuration in: {}", path.display());

    let config_path = path.join("upgrade-pilot.yaml");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)?;
    eprintln!("Created: {}", config_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.contains(".upgrade-pilot") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# upgrade-pilot\n.upgrade-pilot/")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".upgrade-pilot/\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nNext steps:");
    eprintln!("  1. Point tools.adapter and executor.host at your installed tools");
    eprintln!("  2. Run 'upgrade-pilot validate' to check your configuration");
    eprintln!("  3. Run 'upgrade-pilot plan <solution> <version>' to preview the upgrade");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = config_parser(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().validate(&config)?;
    emit(&formatter.format_validation(&config, &result, show_warnings))
}

/// Show the upgrade plans.
async fn cmd_plan(
    config_path: Option<&PathBuf>,
    solution: &Path,
    version: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;
    let collaborators = Collaborators::new(&config);
    let runner = collaborators.runner(&config);

    let plans = runner.plan(solution, version).await?;
    emit(&formatter.format_plans(&plans))
}

/// Run a full upgrade.
async fn cmd_upgrade(
    config_path: Option<&PathBuf>,
    solution: &Path,
    version: &str,
    auto_approve: bool,
    options: UpgradeOptions,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path)?;

    if !auto_approve {
        eprint!(
            "This will upgrade '{}' to {} {}. Continue? [y/N]: ",
            solution.display(),
            config.package.id,
            version
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Upgrade cancelled.");
            return Ok(());
        }
    }

    let collaborators = Collaborators::new(&config);
    let runner = collaborators.runner(&config);

    let report = runner.upgrade(solution, version, options).await?;
    emit(&formatter.format_report(&report))
}

/// Wait for a running script to report its result.
async fn cmd_wait(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let config = load_config(config_path)?;
    let monitor = CompletionMonitor::from_config(&config.executor);

    let outcome = monitor.await_completion().await?;
    emit(&formatter.format_outcome(&outcome))?;
    outcome.into_result()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// External collaborators built from the configuration.
struct Collaborators {
    adapter: AdapterTool,
    resolver: CachedResolver<AdapterTool>,
    package_manager: CliPackageManager,
    executor: ScriptExecutor,
}

impl Collaborators {
    fn new(config: &UpgradeConfig) -> Self {
        let adapter = AdapterTool::new(config.tools.adapter.clone());

        let mut resolver = CachedResolver::new(adapter.clone());
        if let Some(dir) = config.cache.resolved_dir() {
            debug!("Caching package trees in {}", dir.display());
            resolver = resolver.with_disk_cache(dir);
        }

        Self {
            adapter,
            resolver,
            package_manager: CliPackageManager::from_config(&config.tools),
            executor: ScriptExecutor::new(&config.executor),
        }
    }

    fn runner<'a>(&'a self, config: &'a UpgradeConfig) -> UpgradeRunner<'a> {
        UpgradeRunner::new(
            config,
            &self.adapter,
            &self.resolver,
            &self.package_manager,
            &self.executor,
        )
    }
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end())?;
    Ok(())
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser resolving paths against the configuration's directory.
fn config_parser(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates the configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<UpgradeConfig> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = config_parser(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }

    Ok(config)
}
