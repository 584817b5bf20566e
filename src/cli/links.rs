use anyhow::Result;

use super::args::{LinksCliArgs, LinksCommand};
use super::Stores;
use crate::config::Config;
use crate::links::SavedLink;

pub async fn handle_links_command(args: LinksCliArgs) -> Result<()> {
    let config = Config::load()?;
    let links = Stores::open(&config)?.links;

    match args.command.unwrap_or(LinksCommand::List) {
        LinksCommand::List => {
            let saved = links.list().await?;
            if saved.is_empty() {
                println!("No saved links.");
            }
            for (index, link) in saved.iter().enumerate() {
                println!("[{}] {}  {}", index, link.name, link.url);
            }
        }
        LinksCommand::Add { name, url } => {
            let index = links.add(SavedLink::new(&name, &url)?).await?;
            println!("Saved link #{}", index);
        }
        LinksCommand::Remove { index } => {
            let removed = links.remove(index).await?;
            println!("Removed {}", removed.name);
        }
    }

    Ok(())
}
