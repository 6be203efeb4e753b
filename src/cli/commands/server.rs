use clap::Subcommand;
use serde_json::json;

use crate::cli::{config, utils, OutputFormat};

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Set the API server URL")]
    Set {
        #[arg(help = "Server base URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the configured server and its health")]
    Show,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Set { url } => {
            url::Url::parse(&url).map_err(|_| anyhow::anyhow!("Invalid server URL: {}", url))?;

            let mut cfg = config::load_config()?;
            cfg.server_url = url.trim_end_matches('/').to_string();
            // A new server invalidates any session held against the old one.
            cfg.clear_session();
            config::save_config(&cfg)?;

            utils::output_success(
                &output_format,
                &format!("Server set to {}", cfg.server_url),
                Some(json!({ "server_url": cfg.server_url })),
            )
        }
        ServerCommands::Show => {
            let cfg = config::load_config()?;

            let client = reqwest::Client::new();
            let health_url = format!("{}/health", cfg.server_url);
            let status = match client
                .get(&health_url)
                .timeout(std::time::Duration::from_secs(5))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => "up",
                Ok(_) => "degraded",
                Err(_) => "down",
            };

            utils::output_success(
                &output_format,
                &format!("Server {} is {}", cfg.server_url, status),
                Some(json!({ "server_url": cfg.server_url, "status": status })),
            )
        }
    }
}
