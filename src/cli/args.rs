use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetkit")]
#[command(about = "Meeting history and live caption transcripts for Google Meet", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the background service (default)
    Serve,
    /// Print version information
    Version,
    /// List recently attended meetings
    Meetings(MeetingsCliArgs),
    /// Export a meeting transcript as CSV
    Export(ExportCliArgs),
    /// Manage saved meeting links
    Links(LinksCliArgs),
    /// Fetch fresh meeting room URLs
    Discover(DiscoverCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct MeetingsCliArgs {
    /// Show every history entry instead of only the latest
    #[arg(long)]
    pub history: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ExportCliArgs {
    /// Meeting id, e.g. abc-defg-hij
    pub meeting_id: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct LinksCliArgs {
    #[command(subcommand)]
    pub command: Option<LinksCommand>,
}

#[derive(Subcommand, Debug)]
pub enum LinksCommand {
    /// List saved links (default)
    List,
    /// Save a new link
    Add { name: String, url: String },
    /// Delete the link at a position shown by `list`
    Remove { index: usize },
}

#[derive(ClapArgs, Debug)]
pub struct DiscoverCliArgs {
    /// Number of URLs to fetch (default from config)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}
