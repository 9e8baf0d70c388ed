//! DTMF bridge server
//!
//! Serves the DTMF method channel as newline-delimited JSON over stdio:
//! one request object per input line, one reply object per output line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{debug, info, trace};

use dtmf_bridge::{
    config::BridgeConfig,
    core::{DtmfPlugin, MethodCallHandler, MethodChannel, SequencerEvent},
    interfaces::SimulatedPlatform,
    utils::setup_logging,
    Result,
};

#[derive(Parser)]
#[command(name = "dtmf-bridge")]
#[command(about = "DTMF tone playback over a JSON-lines method channel")]
#[command(version = dtmf_bridge::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the method channel on stdin/stdout
    Serve,
    /// Validate configuration
    ValidateConfig,
    /// Generate default configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output }) = &cli.command {
        return generate_default_config(output.clone()).await;
    }

    let config = load_configuration(&cli)?;

    let _log_guard = setup_logging(&config.logging)?;

    info!("Starting {} v{}", dtmf_bridge::NAME, dtmf_bridge::VERSION);

    match &cli.command {
        Some(Commands::Serve) | None => serve(config).await,
        Some(Commands::ValidateConfig) => validate_configuration(&config).await,
        Some(Commands::GenerateConfig { .. }) => Ok(()),
    }
}

fn load_configuration(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(config_path) => BridgeConfig::load_from_file(config_path)?,
        None => BridgeConfig::load_from_env()?,
    };

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn serve(config: BridgeConfig) -> Result<()> {
    let platform = Arc::new(SimulatedPlatform::new(config.platform.clone()));
    let mut plugin = DtmfPlugin::new(platform.clone(), platform.clone(), platform);

    let mut event_rx = plugin
        .take_event_receiver()
        .ok_or_else(|| dtmf_bridge::Error::internal("Failed to get event receiver"))?;
    let plugin = Arc::new(plugin);

    let channel = MethodChannel::new(config.general.channel.clone());
    let handler: Arc<dyn MethodCallHandler> = plugin.clone();
    channel.set_method_call_handler(Some(handler)).await;
    info!("Serving method channel '{}' on stdio", channel.name());

    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            handle_sequencer_event(event);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let mut reply = channel.handle_line(&line).await.to_string();
                reply.push('\n');
                stdout.write_all(reply.as_bytes()).await?;
                stdout.flush().await?;
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    channel.set_method_call_handler(None).await;
    plugin.drain(Duration::from_millis(config.general.drain_timeout_ms)).await;
    event_task.abort();

    info!("DTMF bridge shutdown complete");
    Ok(())
}

fn handle_sequencer_event(event: SequencerEvent) {
    match event {
        SequencerEvent::Suppressed { request_id } => {
            debug!("Request {} suppressed by system setting", request_id);
        }
        SequencerEvent::VolumeApplied { request_id, level } => {
            debug!("Request {} set DTMF stream volume to {}", request_id, level);
        }
        SequencerEvent::ToneStarted { request_id, index, tone } => {
            trace!("Request {} digit {} -> tone {}", request_id, index, tone);
        }
        SequencerEvent::DigitSkipped { request_id, index, digit } => {
            trace!("Request {} digit {} ({:?}) has no tone", request_id, index, digit);
        }
        SequencerEvent::Released { request_id, tones_played } => {
            debug!("Request {} released after {} tone(s)", request_id, tones_played);
        }
    }
}

async fn validate_configuration(config: &BridgeConfig) -> Result<()> {
    info!("Validating configuration...");

    config.validate()?;

    println!("✓ Configuration is valid");
    println!("  Channel: {}", config.general.channel);
    println!("  Platform: {} {}", config.platform.name, config.platform.version);
    println!("  Stream Max Volume: {}", config.platform.stream_max_volume);
    println!(
        "  DTMF Tone When Dialing: {}",
        match config.platform.dtmf_tone_when_dialing {
            Some(true) => "enabled",
            Some(false) => "disabled",
            None => "unreadable",
        }
    );
    println!("  Log Level: {}", config.logging.level);

    Ok(())
}

async fn generate_default_config(output_path: Option<PathBuf>) -> Result<()> {
    let config = BridgeConfig::default_config();
    let toml_content = toml::to_string_pretty(&config)
        .map_err(|e| dtmf_bridge::Error::internal(format!("Failed to serialize config: {}", e)))?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, toml_content)?;
            println!("✓ Default configuration written to: {}", path.display());
        }
        None => {
            println!("{}", toml_content);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_config_generation() {
        let result = generate_default_config(None).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_generated_config_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dtmf.toml");

        generate_default_config(Some(path.clone())).await.unwrap();

        let config = BridgeConfig::load_from_file(&path).unwrap();
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_validation() {
        let config = BridgeConfig::default_config();
        let result = validate_configuration(&config).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_log_level_override() {
        let cli = Cli::parse_from(["dtmf-bridge", "--log-level", "debug"]);
        let config = load_configuration(&cli).unwrap();
        assert_eq!(config.logging.level, "debug");
    }
}
