use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use crate::campaign::{CampaignService, LiveConnector};
use crate::config::Config;

#[derive(Args)]
pub struct CampaignsArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: CampaignsArgs, config: Config) -> Result<()> {
    let output = config.output.clone();
    let service = CampaignService::new(Arc::new(LiveConnector::new(Arc::new(config))), output);
    let campaigns = service.list_campaigns().await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&campaigns)?);
        return Ok(());
    }

    if campaigns.is_empty() {
        println!("{}", "No campaigns found.".dimmed());
        return Ok(());
    }

    for (name, assets) in &campaigns {
        println!("{} {}", name.cyan().bold(), format!("({} creatives)", assets.len()).dimmed());
        for asset in assets {
            println!("  {:<48} {}", asset.filename, asset.url);
        }
        println!();
    }

    Ok(())
}
