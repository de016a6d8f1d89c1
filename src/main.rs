use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use kfchat::Provider;
use kfchat::core::config::{self, CliOverrides, KfchatConfig};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "kfchat", version, about = "Terminal client for the Kubeflow documentation assistant")]
struct Args {
    /// WebSocket endpoint of the chat backend
    #[arg(short, long)]
    url: Option<String>,

    /// LLM provider
    #[arg(short, long, value_enum)]
    provider: Option<Provider>,

    /// Model id (must belong to the provider)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature (0.0 - 1.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum reply tokens (1000 - 8000)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Seconds to wait for a reply before giving up on the connection
    #[arg(long)]
    reply_timeout: Option<u64>,

    /// Log file (stdout belongs to the TUI)
    #[arg(long, default_value = "kfchat.log")]
    log_file: PathBuf,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            url: self.url.clone(),
            provider: self.provider,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            reply_timeout_secs: self.reply_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&args.log_file) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Could not load config file, using defaults: {}", e);
        KfchatConfig::default()
    });
    let resolved = config::resolve(&file_config, &args.overrides());

    log::info!(
        "kfchat starting up: server={} llm={} reply_timeout={}s",
        resolved.server_url,
        resolved.llm.summary(),
        resolved.reply_timeout.as_secs()
    );

    kfchat::tui::run(resolved)
}
