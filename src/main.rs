use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use ncfu::config::{JobConfig, ServerConfig};
use ncfu::job::{ActivationOutcome, PollNotifyJob};

#[derive(Parser)]
#[command(
    name = "ncfu",
    version,
    about = "Moves forgotten in-progress Jira issues back to todo and tells you about it"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "NCFU_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the work service and email a report if needed.
    Activate {
        /// Log the report instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Ping the work service so it stays warm.
    Warm,

    /// Run the work service.
    Serve {
        /// Address to listen on (overrides NCFU_BIND).
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ncfu::logging::init(cli.json);

    runtime_for(&cli.command)?.block_on(run(cli.command))
}

/// The job is one sequential task; only the work service needs worker threads.
fn runtime_for(command: &Commands) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = match command {
        Commands::Serve { .. } => tokio::runtime::Builder::new_multi_thread(),
        Commands::Activate { .. } | Commands::Warm => {
            tokio::runtime::Builder::new_current_thread()
        }
    };
    builder.enable_all().build()
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Activate { dry_run } => {
            let job = build_job(dry_run)?;
            match job.activate().await {
                ActivationOutcome::Clean => tracing::info!("Nothing was left behind"),
                ActivationOutcome::Reported { issues } => {
                    tracing::info!(count = issues.len(), "Reported left-behind issues")
                }
                ActivationOutcome::Exhausted { failures } => {
                    tracing::warn!(count = failures.len(), "Reported failed poll attempts")
                }
            }
        }
        Commands::Warm => {
            // No recipient is needed to ping.
            build_job(true)?.warm().await;
        }
        Commands::Serve { bind } => {
            let config = ServerConfig::from_env()?;
            ncfu::server::serve(bind.unwrap_or(config.bind), &config.jira).await?;
        }
    }

    Ok(())
}

fn build_job(dry_run: bool) -> ncfu::Result<PollNotifyJob> {
    PollNotifyJob::from_config(JobConfig::from_env(dry_run)?, dry_run)
}
