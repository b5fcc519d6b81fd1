use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::GeminiClient;
use crate::campaign::{CampaignService, Connector, LiveConnector};
use crate::config::Config;
use crate::core::CampaignBrief;
use crate::creative::{CreativePipeline, ReferenceUpload};
use crate::report::Reporter;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the campaign brief (JSON)
    #[arg(required = true)]
    pub brief: PathBuf,

    /// Reference image to include (repeatable, paired with --desc)
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,

    /// Role of the matching --image, e.g. "brand logo"
    #[arg(short, long = "desc")]
    pub descriptions: Vec<String>,

    /// Upload creatives to Dropbox and report like the gateway does
    #[arg(long)]
    pub upload: bool,

    /// Staging directory (overrides output.staging_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (text, json, quiet)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: RunArgs, mut config: Config) -> Result<()> {
    if args.images.len() != args.descriptions.len() {
        bail!(
            "Every --image needs a --desc ({} images, {} descriptions)",
            args.images.len(),
            args.descriptions.len()
        );
    }

    let data = tokio::fs::read_to_string(&args.brief)
        .await
        .with_context(|| format!("Failed to read brief {}", args.brief.display()))?;
    let brief = CampaignBrief::from_json(&data)?;

    let mut uploads = Vec::with_capacity(args.images.len());
    for (path, description) in args.images.iter().zip(&args.descriptions) {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        uploads.push(ReferenceUpload::new(bytes, description.clone()));
    }

    if let Some(dir) = &args.output {
        config.output.staging_dir = dir.to_string_lossy().into_owned();
    }

    let pb = if args.format == "text" {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.yellow} {msg}")?,
        );
        pb.set_message(format!(
            "Generating {} creatives for '{}'...",
            brief.expected_creatives(),
            brief.campaign_name
        ));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let expected = brief.expected_creatives();
    let result = if args.upload {
        run_with_upload(brief, uploads, config).await
    } else {
        run_local(brief, uploads, config).await
    };

    let produced = match result {
        Ok(produced) => produced,
        Err(e) => {
            if let Some(pb) = pb {
                pb.finish_with_message(format!("{} Run failed", "✗".red()));
            }
            return Err(e);
        }
    };

    if let Some(pb) = &pb {
        let mark = if produced.len() < expected {
            "!".yellow()
        } else {
            "✓".green()
        };
        pb.finish_with_message(format!("{} Generated {}/{} creative(s)", mark, produced.len(), expected));
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&produced)?),
        "quiet" => {
            for item in &produced {
                println!("{}", item);
            }
        }
        _ => {
            println!();
            let label = if args.upload { "Uploaded Creatives" } else { "Staged Creatives" };
            println!("{}:", label.cyan().bold());
            for item in &produced {
                println!("  {}", item);
            }
        }
    }

    Ok(())
}

/// Generate into the staging directory and log the run; nothing leaves the machine
async fn run_local(brief: CampaignBrief, uploads: Vec<ReferenceUpload>, config: Config) -> Result<Vec<String>> {
    let model = GeminiClient::image_client(&config)?.connect().await?;
    let pipeline = CreativePipeline::new(&model, &config.output.staging_dir);
    let artifacts = pipeline.run(&brief, uploads).await?;

    let paths: Vec<String> = artifacts
        .iter()
        .map(|a| a.path.to_string_lossy().into_owned())
        .collect();

    let connector = LiveConnector::new(Arc::new(config.clone()));
    let reporter = Reporter::new(
        &config.output.logs_dir,
        &config.output.alerts_dir,
        connector.text_model(),
    );
    if let Err(e) = reporter.run_post_process_checks(&brief, &paths).await {
        tracing::error!("Failed to write run log: {}", e);
    }

    Ok(paths)
}

async fn run_with_upload(brief: CampaignBrief, uploads: Vec<ReferenceUpload>, config: Config) -> Result<Vec<String>> {
    let output = config.output.clone();
    let service = CampaignService::new(Arc::new(LiveConnector::new(Arc::new(config))), output);
    let outcome = service.process_brief(brief, uploads).await?;
    Ok(outcome.image_urls)
}
