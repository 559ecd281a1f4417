use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use udpsim_config::{ConfigOverrides, NetworkConfig};
use udpsim_engine::{Simulator, SimulatorError};
use udpsim_telemetry::EventLogger;

#[derive(Parser, Debug)]
#[command(
    name = "udpsim",
    version,
    about = "UDP proxy that injects loss, delay, jitter and reorder latency",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulator until Ctrl-C (the default)
    Run(RunArgs),
    /// Print the resolved configuration and exit
    ShowConfig(ConfigArgs),
    /// Write the resolved configuration to a YAML file
    SaveConfig(SaveConfigArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print Prometheus metrics on shutdown
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SaveConfigArgs {
    /// Destination file
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Configuration source plus per-field overrides. Rates are percentages.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file (defaults to config/udpsim.yaml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "HOST")]
    pub listen_host: Option<String>,

    #[arg(long, value_name = "PORT")]
    pub listen_port: Option<u16>,

    #[arg(long, value_name = "HOST")]
    pub target_host: Option<String>,

    #[arg(long, value_name = "PORT")]
    pub target_port: Option<u16>,

    /// Packet loss, e.g. 5 or 5%
    #[arg(long, value_name = "RATE", value_parser = parse_percent)]
    pub packet_loss: Option<f64>,

    /// Share of packets deferred, e.g. 10 or 10%
    #[arg(long, value_name = "RATE", value_parser = parse_percent)]
    pub delay_rate: Option<f64>,

    /// Share of deferred packets that also get jitter
    #[arg(long, value_name = "RATE", value_parser = parse_percent)]
    pub jitter_rate: Option<f64>,

    /// Share of packets held before egress
    #[arg(long, value_name = "RATE", value_parser = parse_percent)]
    pub reorder_rate: Option<f64>,

    /// Base delay for deferred packets, in milliseconds
    #[arg(long, value_name = "MS")]
    pub base_delay: Option<u64>,

    /// Maximum extra jitter, in milliseconds
    #[arg(long, value_name = "MS")]
    pub max_jitter: Option<u64>,

    /// Seed for reproducible impairment decisions
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable per-packet logging
    #[arg(long)]
    pub no_log: bool,

    /// Disable the status line and final summary
    #[arg(long)]
    pub no_stats: bool,
}

impl ConfigArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            packet_loss_rate: self.packet_loss,
            delay_rate: self.delay_rate,
            jitter_rate: self.jitter_rate,
            reordering_rate: self.reorder_rate,
            base_delay_ms: self.base_delay,
            max_jitter_ms: self.max_jitter,
            listen_host: self.listen_host.clone(),
            listen_port: self.listen_port,
            target_host: self.target_host.clone(),
            target_port: self.target_port,
            enable_logging: self.no_log.then_some(false),
            enable_statistics: self.no_stats.then_some(false),
            seed: self.seed,
        }
    }

    /// Defaults, then file, then `UDPSIM_*` environment, then these flags.
    pub fn resolve(&self) -> anyhow::Result<NetworkConfig> {
        let figment = NetworkConfig::figment(self.config.as_deref())?;
        let config = NetworkConfig::from_figment(self.overrides().apply(figment))?;
        Ok(config)
    }
}

/// Accepts `5`, `5%` or `12.5` and returns the fraction.
fn parse_percent(value: &str) -> Result<f64, String> {
    let number = value.trim().trim_end_matches('%').trim();
    let percent: f64 = number
        .parse()
        .map_err(|_| format!("'{value}' is not a percentage"))?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(format!("'{value}' must be between 0 and 100"));
    }
    Ok(percent / 100.0)
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None => run_simulator(cli.run).await,
        Some(Commands::Run(args)) => run_simulator(args).await,
        Some(Commands::ShowConfig(args)) => {
            println!("{}", args.resolve()?.summary());
            Ok(())
        }
        Some(Commands::SaveConfig(args)) => {
            let config = args.config.resolve()?;
            config
                .save_to_path(&args.output)
                .with_context(|| format!("writing {}", args.output.display()))?;
            println!("Configuration saved to {}", args.output.display());
            Ok(())
        }
    }
}

async fn run_simulator(args: RunArgs) -> anyhow::Result<()> {
    let config = args.config.resolve()?;
    EventLogger::init(if config.enable_logging { "info" } else { "warn" });

    if config.enable_logging {
        println!("{}", config.summary());
    }
    let show_stats = config.enable_statistics;

    // Socket setup and thread joins block, so they stay off the async workers.
    let (mut simulator, local_addr) = tokio::task::spawn_blocking(move || {
        let mut simulator = Simulator::new(config)?;
        let local_addr = simulator.start()?;
        Ok::<_, SimulatorError>((simulator, local_addr))
    })
    .await?
    .context("failed to start simulator")?;

    println!(
        "Forwarding {} -> {} (Ctrl-C to stop)",
        local_addr,
        simulator.target_addr()
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if show_stats {
                    println!("{}", simulator.stats().status_line());
                }
            }
        }
    }

    println!("Shutting down...");
    simulator = tokio::task::spawn_blocking(move || {
        simulator.stop();
        simulator
    })
    .await?;

    if args.metrics {
        print!("{}", simulator.metrics().gather_metrics()?);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn percent_accepts_plain_and_suffixed() {
        assert_eq!(parse_percent("5").unwrap(), 0.05);
        assert_eq!(parse_percent("5%").unwrap(), 0.05);
        assert_eq!(parse_percent("100").unwrap(), 1.0);
        assert!(parse_percent("101").is_err());
        assert!(parse_percent("-1").is_err());
        assert!(parse_percent("lots").is_err());
    }

    #[test]
    fn bare_flags_run_the_simulator() {
        let cli = Cli::try_parse_from([
            "udpsim",
            "--packet-loss",
            "5%",
            "--base-delay",
            "50",
            "--no-log",
        ])
        .unwrap();
        assert!(cli.command.is_none());

        let overrides = cli.run.config.overrides();
        assert_eq!(overrides.packet_loss_rate, Some(0.05));
        assert_eq!(overrides.base_delay_ms, Some(50));
        assert_eq!(overrides.enable_logging, Some(false));
        assert_eq!(overrides.enable_statistics, None);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["udpsim", "save-config", "out.yaml", "--delay-rate", "20"])
            .unwrap();
        match cli.command {
            Some(Commands::SaveConfig(args)) => {
                assert_eq!(args.output, PathBuf::from("out.yaml"));
                assert_eq!(args.config.delay_rate, Some(0.2));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["udpsim", "run", "--metrics"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run(RunArgs { metrics: true, .. }))));
    }

    #[test]
    fn flags_override_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let args = ConfigArgs {
                listen_port: Some(9000),
                reorder_rate: Some(0.25),
                no_stats: true,
                ..Default::default()
            };
            let config = args.resolve().map_err(|e| e.to_string())?;
            assert_eq!(config.listen_port, 9000);
            assert_eq!(config.reordering_rate, 0.25);
            assert_eq!(config.packet_loss_rate, 0.0);
            assert!(!config.enable_statistics);
            Ok(())
        });
    }

    #[test]
    fn flags_override_file_and_environment() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("sim.yaml", "target_port: 7000\ndelay_rate: 0.1")?;
            jail.set_env("UDPSIM_DELAY_RATE", "0.3");
            jail.set_env("UDPSIM_JITTER_RATE", "0.4");
            let args = ConfigArgs {
                config: Some(PathBuf::from("sim.yaml")),
                delay_rate: Some(0.5),
                ..Default::default()
            };
            let config = args.resolve().map_err(|e| e.to_string())?;
            assert_eq!(config.target_port, 7000);
            assert_eq!(config.delay_rate, 0.5);
            assert_eq!(config.jitter_rate, 0.4);
            Ok(())
        });
    }

    #[test]
    fn missing_config_file_is_an_error() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let args = ConfigArgs {
                config: Some(PathBuf::from("does/not/exist.yaml")),
                ..Default::default()
            };
            assert!(args.resolve().is_err());
            Ok(())
        });
    }
}
