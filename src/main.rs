//! toolrun - external tool invocation and diagnostics pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use toolrun::config::RunnerConfig;
use toolrun::display::{self, ConsoleSink, OutputFormat};
use toolrun::orchestrator::{ToolInvocation, ToolRunner};

#[derive(Parser)]
#[command(
    name = "toolrun",
    about = "Run an external tool and turn its output into structured diagnostics",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tool and report its diagnostics.
    Run {
        /// Tool name (resolved on PATH) or path to run.
        tool: String,
        /// Arguments passed to the tool verbatim.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Overall timeout in seconds; the tool is terminated on expiry.
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Config file to load instead of the user config directory.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Read an argument payload from this file and pass it to the tool
        /// via a temporary response file.
        #[arg(long, value_name = "FILE")]
        response_args: Option<PathBuf>,
        /// Working directory for the tool.
        #[arg(short = 'C', long)]
        working_dir: Option<PathBuf>,
        /// Output format for diagnostics and messages.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            tool,
            args,
            timeout,
            config,
            response_args,
            working_dir,
            format,
        } => {
            let config = match config {
                Some(path) => RunnerConfig::load_from_path(&path),
                None => RunnerConfig::load_default(),
            };
            let config = match config {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "failed to load configuration");
                    std::process::exit(2);
                }
            };

            let mut invocation = ToolInvocation::new(tool.clone()).args(args);
            if let Some(secs) = timeout {
                invocation = invocation.timeout(Duration::from_secs(secs));
            }
            if let Some(dir) = working_dir {
                invocation = invocation.working_dir(dir);
            }
            if let Some(path) = response_args {
                match std::fs::read_to_string(&path) {
                    Ok(payload) => invocation = invocation.response_payload(payload),
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "failed to read argument payload");
                        std::process::exit(2);
                    }
                }
            }

            let runner = ToolRunner::new(config, Arc::new(ConsoleSink::new(format)));
            match runner.run(&invocation).await {
                Ok(outcome) => {
                    if format == OutputFormat::Text {
                        display::print_outcome(&tool, outcome.success, outcome.exit_code);
                    }
                    let code = u8::try_from(outcome.exit_code).unwrap_or(1);
                    std::process::exit(i32::from(code));
                }
                Err(e) => {
                    tracing::error!(error = %e, "tool run failed");
                    std::process::exit(2);
                }
            }
        }
    }
}
