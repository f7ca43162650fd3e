//! gt-telemetry: watch or record Gran Turismo 7 telemetry.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gt_ingest_core::{logging, GtConfig};
use std::{path::PathBuf, time::Duration};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "gt-telemetry", version, about = "Gran Turismo 7 telemetry monitor and capture tool")]
struct Cli {
    /// udp://host:port, host:port, or a .gtr/.gtz capture file
    #[arg(short, long, global = true, env = "GT_SOURCE")]
    source: Option<String>,

    /// silent, error, warn, info or debug
    #[arg(long, global = true, env = "GT_LOG_LEVEL")]
    log_level: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vehicle catalog override
    #[arg(long, global = true, env = "GT_VEHICLE_DB")]
    vehicle_db: Option<PathBuf>,

    /// Collect packet statistics
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print derived metrics as JSON lines
    Monitor {
        /// Minimum time between printed frames
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Record one session to a capture file
    Capture {
        /// Output file, .gtr (raw) or .gtz (gzip)
        #[arg(short, long, default_value = "gt7-replay.gtz")]
        output: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<GtConfig> {
    let mut cfg = match &cli.config {
        Some(path) => GtConfig::from_json_file(path)?,
        None => GtConfig::default(),
    };
    if let Some(source) = &cli.source {
        cfg.source = source.clone();
    }
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }
    if cli.vehicle_db.is_some() {
        cfg.vehicle_db = cli.vehicle_db.clone();
    }
    cfg.stats_enabled |= cli.stats;
    cfg.source_addr().with_context(|| format!("source {:?}", cfg.source))?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    let (level, known) = logging::LogLevel::parse_lenient(&cfg.log_level);
    tracing::subscriber::set_global_default(logging::subscriber(level)).context("install logger")?;
    if !known {
        warn!(level = %cfg.log_level, "unknown log level, using warn");
    }

    match cli.command {
        Command::Monitor { interval_ms } => commands::monitor(cfg, Duration::from_millis(interval_ms)).await,
        Command::Capture { output } => commands::capture(cfg, output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "gt-telemetry",
            "--source",
            "192.168.1.50",
            "--stats",
            "capture",
            "-o",
            "run.gtr",
        ])
        .unwrap();
        let cfg = load_config(&cli).unwrap();
        assert_eq!(cfg.source, "192.168.1.50");
        assert!(cfg.stats_enabled);
        assert!(matches!(cli.command, Command::Capture { ref output } if output == &PathBuf::from("run.gtr")));
    }

    #[test]
    fn defaults_to_broadcast_monitor() {
        let cli = Cli::try_parse_from(["gt-telemetry", "monitor"]).unwrap();
        let cfg = load_config(&cli).unwrap();
        assert_eq!(cfg.source, GtConfig::default().source);
        assert!(matches!(cli.command, Command::Monitor { interval_ms: 500 }));
    }

    #[test]
    fn bad_source_is_rejected() {
        let cli = Cli::try_parse_from(["gt-telemetry", "-s", "udp://console:99999", "monitor"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
