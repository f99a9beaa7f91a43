//! `hotdog-deploy` - plan, deploy and verify the contract suite from one registry.

use clap::{Parser, Subcommand};
use deploy_core::observability::{set_log_format, setup_logging, LogFormat};
use deploy_core::DeployError;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod output;

/// Exit code for `verify --strict` when findings exist.
const EXIT_FINDINGS: u8 = 5;

#[derive(Parser)]
#[command(name = "hotdog-deploy")]
#[command(about = "Dependency-ordered, resumable contract deployments", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./deploy.toml when present)
    #[arg(short, long, env = "DEPLOY_CONFIG")]
    config: Option<PathBuf>,

    /// State store database
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Registry manifest (defaults to the built-in suite)
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Log output format (pretty, json)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the deployment order and what each step would do
    Plan {
        /// Artifacts to plan (default: all)
        targets: Vec<String>,

        /// Print machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Deploy targets and their dependencies, skipping what is already deployed
    Deploy {
        /// Artifacts to deploy (default: all)
        targets: Vec<String>,

        /// Only plan, do not deploy
        #[arg(long)]
        dry_run: bool,

        /// Deploy these again even if their arguments are unchanged
        #[arg(long, value_name = "NAME")]
        redeploy: Vec<String>,

        /// Deployer service endpoint (switches to the HTTP capability)
        #[arg(long, env = "DEPLOY_ENDPOINT")]
        endpoint: Option<String>,

        /// Print Prometheus metrics after the run
        #[arg(long)]
        metrics: bool,

        /// Clear a run lock left behind by a killed process
        #[arg(long)]
        break_lock: bool,
    },

    /// Check recorded wiring against current dependency addresses
    Verify {
        /// Artifacts to check, with their dependencies (default: all records)
        targets: Vec<String>,

        /// Exit non-zero when anything is reported
        #[arg(long)]
        strict: bool,

        /// Print machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Record an artifact deployed outside this tool
    Import {
        name: String,
        address: String,
    },

    /// List every record for an artifact, newest first
    History {
        name: String,

        /// Print machine-readable output
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    setup_logging(cli.log_format.unwrap_or_default(), level);

    let context = match commands::Context::load(&cli).await {
        Ok(context) => context,
        Err(e) => return report_error(&e),
    };
    if cli.log_format.is_none() {
        set_log_format(context.config.log_format);
    }

    let result = match cli.command {
        Commands::Plan { targets, json } => commands::plan(&context, targets, json).await,
        Commands::Deploy {
            targets,
            dry_run,
            redeploy,
            endpoint,
            metrics,
            break_lock,
        } => {
            let options = commands::DeployOptions {
                dry_run,
                redeploy,
                endpoint,
                metrics,
                break_lock,
            };
            commands::deploy(context, targets, options).await
        }
        Commands::Verify {
            targets,
            strict,
            json,
        } => match commands::verify(&context, targets, json).await {
            Ok(clean) => return ExitCode::from(verify_code(clean, strict)),
            Err(e) => Err(e),
        },
        Commands::Import { name, address } => commands::import(&context, &name, &address).await,
        Commands::History { name, json } => commands::history(&context, &name, json).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn verify_code(clean: bool, strict: bool) -> u8 {
    if strict && !clean {
        EXIT_FINDINGS
    } else {
        0
    }
}

/// Exit code for a failed command: the orchestrator's own code when one is wrapped inside.
fn error_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<DeployError>()
        .map_or(1, |e| e.exit_code() as u8)
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {:#}", err);
    ExitCode::from(error_code(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use deploy_core::executor::CapabilityError;

    #[test]
    fn test_strict_verify_with_findings() {
        assert_eq!(verify_code(false, true), EXIT_FINDINGS);
        assert_eq!(verify_code(true, true), 0);
        assert_eq!(verify_code(false, false), 0);
    }

    #[test]
    fn test_capability_failure_exit_code() {
        let err = anyhow::Error::from(DeployError::DeploymentCapabilityFailure {
            artifact: "Employee".into(),
            args: vec![],
            source: CapabilityError::Rejected("out of gas".into()),
        });
        assert_eq!(error_code(&err), 3);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err: anyhow::Result<()> = Err(DeployError::StoreLocked {
            holder: "run-a".into(),
        })
        .context("opening state store .deploy/state.db");
        assert_eq!(error_code(&err.unwrap_err()), 4);

        let err: anyhow::Result<()> = Err(DeployError::InvalidRegistry("missing".into()))
            .context("loading registry");
        assert_eq!(error_code(&err.unwrap_err()), 2);
    }

    #[test]
    fn test_foreign_errors_exit_with_one() {
        assert_eq!(error_code(&anyhow::anyhow!("terminal closed")), 1);
    }

    #[test]
    fn test_cli_parses_verify_flags() {
        let cli = Cli::parse_from(["hotdog-deploy", "verify", "--strict", "Freezer"]);
        match cli.command {
            Commands::Verify { targets, strict, json } => {
                assert_eq!(targets, vec!["Freezer"]);
                assert!(strict);
                assert!(!json);
            }
            _ => panic!("expected verify"),
        }
    }
}
