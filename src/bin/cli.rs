//! DTMF bridge CLI tool
//!
//! Plays a digit string on the simulated platform and waits for the
//! sequence to finish, printing what the host was asked to do.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;

use dtmf_bridge::config::{LoggingConfig, PlatformConfig};
use dtmf_bridge::core::{Dispatch, ToneRequest, ToneSequencer};
use dtmf_bridge::interfaces::{PlatformActivity, PlatformInfo, SimulatedPlatform};
use dtmf_bridge::protocols::DtmfTone;
use dtmf_bridge::utils::setup_logging;

#[derive(Parser)]
#[command(name = "dtmf-cli")]
#[command(about = "DTMF Bridge CLI Tool")]
#[command(version = dtmf_bridge::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a digit string and wait for it to finish
    Play {
        /// Keypad symbols: 0-9 * # A-D
        digits: String,
        /// Tone duration in milliseconds
        #[arg(short, long, default_value = "100")]
        duration: u32,
        /// Volume as a fraction of the stream maximum
        #[arg(short, long, default_value = "0.5")]
        volume: f64,
        /// Play even if the system preference disables dialing tones
        #[arg(long)]
        ignore_system_settings: bool,
        /// Scale volume against the fixed ceiling instead of the stream maximum
        #[arg(long)]
        force_max_volume: bool,
        /// Simulated "DTMF tone when dialing" preference
        #[arg(long, value_enum, default_value = "enabled")]
        setting: SettingState,
    },
    /// Show the keypad tone table
    Tones,
    /// Show the simulated platform version
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum SettingState {
    Enabled,
    Disabled,
    Unreadable,
}

impl SettingState {
    fn preference(self) -> Option<bool> {
        match self {
            SettingState::Enabled => Some(true),
            SettingState::Disabled => Some(false),
            SettingState::Unreadable => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level.clone(),
        ..LoggingConfig::default()
    };
    let _log_guard = setup_logging(&logging).context("failed to initialize logging")?;

    match cli.command {
        Commands::Play {
            ref digits,
            duration,
            volume,
            ignore_system_settings,
            force_max_volume,
            setting,
        } => {
            let duration = Duration::from_millis(u64::from(duration));
            let request = ToneRequest::new(digits.as_str(), duration)
                .with_volume(volume)
                .ignore_system_setting(ignore_system_settings)
                .force_max_volume(force_max_volume);
            play(request, setting).await
        }
        Commands::Tones => {
            show_tones();
            Ok(())
        }
        Commands::Version => {
            let platform = SimulatedPlatform::new(PlatformConfig::default());
            println!("{} {}", "Platform:".bold(), platform.platform_version());
            println!("{} {}", "Bridge:".bold(), dtmf_bridge::VERSION);
            Ok(())
        }
    }
}

async fn play(request: ToneRequest, setting: SettingState) -> anyhow::Result<()> {
    if request.duration.is_zero() {
        anyhow::bail!("duration must be greater than zero");
    }

    let config = PlatformConfig {
        dtmf_tone_when_dialing: setting.preference(),
        ..PlatformConfig::default()
    };
    let platform = Arc::new(SimulatedPlatform::new(config));
    let sequencer = ToneSequencer::new(platform.clone(), platform.clone());

    println!("{}", format!("Playing \"{}\"", request.digits).bold().blue());

    let handle = match sequencer.play_tone(request).await.context("playback failed")? {
        Dispatch::Suppressed => {
            let notice = "DTMF tones are disabled by the system setting; nothing played";
            println!("{}", notice.yellow());
            return Ok(());
        }
        Dispatch::Started(handle) => handle,
    };

    println!("  Request: {}", handle.request_id().to_string().dimmed());
    println!("  Level:   {}", handle.level().to_string().bold());
    handle.finished().await;

    println!();
    println!(
        "{:<8} {:<6} {:<14} {:<10}",
        "At".bold(),
        "Tone".bold(),
        "Frequencies".bold(),
        "Duration".bold()
    );
    println!("{}", "─".repeat(42));

    let mut first_start = None;
    for activity in platform.activity() {
        if let PlatformActivity::ToneStarted { tone, duration, at, .. } = activity {
            let origin = *first_start.get_or_insert(at);
            let (low, high) = tone.frequencies();
            println!(
                "{:<8} {:<6} {:<14} {:<10}",
                format!("{} ms", at.duration_since(origin).as_millis()),
                tone.to_string().green(),
                format!("{}/{} Hz", low, high),
                format!("{} ms", duration.as_millis()),
            );
        }
    }

    println!();
    println!(
        "{} {} tone(s), generator released: {}",
        "Done:".bold(),
        platform.started_tones().len(),
        if platform.generators_released() == 1 { "yes".green() } else { "no".red() }
    );

    Ok(())
}

fn show_tones() {
    println!("{}", "DTMF Keypad Tones".bold().blue());
    println!();
    println!(
        "{:<8} {:<6} {:<10} {:<10}",
        "Symbol".bold(),
        "Code".bold(),
        "Low Hz".bold(),
        "High Hz".bold()
    );
    println!("{}", "─".repeat(36));
    for tone in DtmfTone::ALL {
        let (low, high) = tone.frequencies();
        println!("{:<8} {:<6} {:<10} {:<10}", tone.to_string().green(), tone.code(), low, high);
    }
}
