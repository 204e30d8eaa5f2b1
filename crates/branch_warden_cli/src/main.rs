use clap::{Parser, Subcommand};

use branch_warden_cli::commands::reconcile_cmd::{self, ReconcileArgs};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Branch Warden CLI: Enforce branch protection and merge approval policy across a GitLab group
#[derive(Parser)]
#[command(name = "branch-warden")]
#[command(
    about = "Enforce branch protection and merge approval policy across a GitLab group",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the protected branch of every project in the configured group
    #[command()]
    Reconcile(ReconcileArgs),

    /// Show the CLI version
    Version,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("BRANCH_WARDEN_LOG"))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Reconcile(args) => match reconcile_cmd::execute(args).await {
            Ok((report, rendered)) => {
                println!("{}", rendered);
                if report.has_failures() {
                    warn!(
                        "Run finished with {} failed repositories",
                        report.failed_count()
                    );
                    std::process::exit(1);
                }
                std::process::exit(0);
            }
            Err(e) => {
                error!(message = "Run aborted", error = %e);
                eprintln!("Error: {e}");
                std::process::exit(2);
            }
        },
        Commands::Version => {
            // Print version info from baked-in value
            println!(
                "branch-warden version {}",
                option_env!("BRANCH_WARDEN_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            std::process::exit(0);
        }
    }
}
