use anyhow::Result;
use std::sync::Arc;

use super::args::DiscoverCliArgs;
use crate::config::Config;
use crate::discovery::{HttpCandidateFetcher, MeetingUrlDiscovery};
use crate::meeting::MeetingUrlMatcher;

pub async fn handle_discover_command(args: DiscoverCliArgs) -> Result<()> {
    let config = Config::load()?;
    let count = args.count.unwrap_or(config.discovery.default_count);

    let discovery = MeetingUrlDiscovery::new(
        Arc::new(HttpCandidateFetcher::new(&config.discovery.new_meeting_url)?),
        MeetingUrlMatcher::new(&config.tracker.meeting_host)?,
    )
    .with_max_count(config.discovery.max_count);

    let ids = discovery.discover(count).await?;
    if ids.is_empty() {
        println!("No meeting URLs found (are you signed in?)");
    }
    for id in ids {
        println!("{}", discovery.meeting_url(&id));
    }

    Ok(())
}
