use anyhow::Result;
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::campaign::{CampaignService, LiveConnector};
use crate::config::Config;
use crate::server::{run_server, AppState};

#[derive(Args, Default)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind_addr)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Front-end directory served at / (overrides server.static_dir)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, config: Config) -> Result<()> {
    let addr = args.bind.unwrap_or(config.server.bind_addr);
    let static_dir = args
        .static_dir
        .unwrap_or_else(|| PathBuf::from(&config.server.static_dir));

    if config.image_model().is_none() {
        tracing::warn!("GEMINI_IMG_MODEL is not set; /process-brief will fail until it is");
    }

    let output = config.output.clone();
    let connector = Arc::new(LiveConnector::new(Arc::new(config)));
    let state = AppState {
        service: CampaignService::new(connector, output),
    };

    run_server(addr, state, &static_dir).await
}
