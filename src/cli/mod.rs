pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "forge",
    version,
    about = "Creative Forge - turn campaign briefs into ad creatives with Google Gemini",
    long_about = r#"Creative Forge - turn campaign briefs into ad creatives with Google Gemini

For every product in a brief, Forge generates a square (1:1), portrait (9:16)
and landscape (16:9) creative, uploads them to Dropbox under the campaign's
folder, and writes a run log. Short runs get an AI-written alert email.
Run without arguments to start the HTTP gateway.

SETUP:
  Put these in the environment or a .env file:
    GOOGLE_API_KEY=...            Gemini API key
    GEMINI_IMG_MODEL=...          image model (required, e.g. gemini-2.5-flash-image)
    GEMINI_TEXT_MODEL=...         alert model (default gemini-2.5-flash-lite)
    DROPBOX_APP_KEY=...
    DROPBOX_APP_SECRET=...
    DROPBOX_REFRESH_TOKEN=...

EXAMPLES:
  Start the gateway:
    forge serve --bind 127.0.0.1:8000

  Generate locally from a brief file:
    forge run brief.json --image logo.png --desc "brand logo"

  Generate and upload:
    forge run brief.json --upload

  List stored campaigns:
    forge campaigns --format json"#
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway (default)
    #[command(alias = "s")]
    Serve(commands::serve::ServeArgs),

    /// Run a campaign brief from a JSON file
    ///
    /// Without --upload the creatives stay in the staging directory.
    #[command(
        alias = "r",
        after_help = r#"EXAMPLES:
  Local run, two reference images:
    forge run brief.json --image logo.png --desc "brand logo" --image hero.jpg --desc "product photo"

  Full run with upload and reporting:
    forge run brief.json --upload"#
    )]
    Run(commands::run::RunArgs),

    /// List stored campaigns and their creatives
    #[command(alias = "ls")]
    Campaigns(commands::campaigns::CampaignsArgs),

    /// View or modify configuration
    #[command(
        alias = "c",
        after_help = r#"AVAILABLE SETTINGS:
  api.key                - Gemini API key
  api.image_model        - Image model (required)
  api.text_model         - Text model used for alerts
  api.base_url           - Gemini API base URL
  storage.app_key        - Dropbox app key
  storage.app_secret     - Dropbox app secret
  storage.refresh_token  - Dropbox refresh token
  server.bind_addr       - Gateway listen address
  server.static_dir      - Front-end directory served at /
  output.staging_dir     - Where creatives are staged before upload
  output.logs_dir        - Run logs
  output.alerts_dir      - Alert emails"#
    )]
    Config(commands::config::ConfigArgs),
}
