use anyhow::Result;
use clap::Parser;
use meetkit::{
    app,
    cli::{
        handle_discover_command, handle_export_command, handle_links_command,
        handle_meetings_command, Cli, CliCommand,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("meetkit {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Meetings(args)) => {
            handle_meetings_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Export(args)) => {
            handle_export_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Links(args)) => {
            handle_links_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Discover(args)) => {
            handle_discover_command(args).await?;
            return Ok(());
        }
        Some(CliCommand::Serve) | None => {}
    }

    app::run_service().await
}
