use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use stationctl::{
    ConnectionManager, ConnectionRequest, config,
    wifi::sim::SimulatedDriver,
};

/// Station-mode WiFi connection manager
#[derive(Parser, Debug)]
#[command(
    name = "stationctl",
    about = "Bring a WiFi station up, connect with bounded retries, and report link status.",
    long_about = None,
    version = env!("CARGO_PKG_VERSION"),
    disable_version_flag = true
)]
struct Args {
    /// Print version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),

    /// Use the simulated radio instead of the platform driver
    #[arg(long, global = true)]
    simulate: bool,

    /// Association failures the simulated radio reports before succeeding
    #[arg(long, global = true, default_value_t = 0)]
    sim_failures: usize,

    /// Disconnect reason code used for simulated failures
    #[arg(long, global = true, default_value_t = 201)]
    sim_reason: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List nearby access points
    Scan,

    /// Connect once and report the outcome
    Connect(ConnectArgs),

    /// Connect, then report link status periodically until Ctrl+C
    Monitor {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Seconds between status reports
        #[arg(
            long,
            default_value_t = config::STATUS_POLL_INTERVAL_SECS,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval_secs: u64,
    },
}

#[derive(clap::Args, Debug)]
struct ConnectArgs {
    /// Network to join
    #[arg(long, env = config::ENV_SSID)]
    ssid: String,

    /// Passphrase, empty for open networks
    #[arg(long, env = config::ENV_PASSWORD, default_value = "", hide_env_values = true)]
    password: String,

    /// Reconnect attempts before giving up
    #[arg(long, default_value_t = config::DEFAULT_MAX_RETRY)]
    max_retry: u32,

    /// Give up waiting after this many seconds (default: wait indefinitely)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ConnectArgs {
    fn request(&self) -> Result<ConnectionRequest> {
        let credential = SecretString::from(self.password.clone());
        let mut request = ConnectionRequest::new(self.ssid.clone(), credential, self.max_retry)?;
        if let Some(secs) = self.timeout_secs {
            request = request.with_timeout(Duration::from_secs(secs));
        }
        Ok(request)
    }
}

fn build_manager(args: &Args) -> Result<ConnectionManager> {
    #[cfg(windows)]
    if !args.simulate {
        let driver = stationctl::wifi::WlanDriver::open()?;
        return Ok(ConnectionManager::init(Arc::new(driver))?);
    }
    #[cfg(not(windows))]
    if !args.simulate {
        info!("No radio driver for this platform, using the simulated radio");
    }

    let driver = SimulatedDriver::failing(args.sim_failures, args.sim_reason)
        .with_demo_access_points();
    Ok(ConnectionManager::init(Arc::new(driver))?)
}

async fn connect(manager: &Arc<ConnectionManager>, args: &ConnectArgs) -> Result<()> {
    let request = args.request()?;
    let manager = Arc::clone(manager);
    let connected = tokio::task::spawn_blocking(move || manager.connect(&request)).await??;
    match connected.address {
        Some(address) => info!(ssid = %connected.ssid, %address, "WiFi connected successfully"),
        None => info!(ssid = %connected.ssid, "WiFi connected successfully"),
    }
    Ok(())
}

async fn monitor(manager: &Arc<ConnectionManager>, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if manager.is_connected() {
                    let status = manager.status();
                    info!(phase = %status.phase, retry_count = status.retry_count, "WiFi connected");
                } else {
                    error!("WiFi disconnected!");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let manager = Arc::clone(manager);
    tokio::task::spawn_blocking(move || manager.disconnect()).await??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let manager = Arc::new(build_manager(&args)?);

    match &args.command {
        Command::Scan => {
            let scanner = Arc::clone(&manager);
            let access_points =
                tokio::task::spawn_blocking(move || scanner.scan_networks()).await??;
            for ap in &access_points {
                println!("{:<32} {:>5} dBm  {}", ap.ssid, ap.rssi, ap.auth_mode);
            }
        }
        Command::Connect(connect_args) => {
            connect(&manager, connect_args).await?;
        }
        Command::Monitor {
            connect: connect_args,
            interval_secs,
        } => {
            connect(&manager, connect_args).await?;
            monitor(&manager, Duration::from_secs(*interval_secs)).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_rejects_zero_interval() {
        let parsed = Args::try_parse_from([
            "stationctl",
            "monitor",
            "--ssid",
            "lab",
            "--interval-secs",
            "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn monitor_accepts_positive_interval() {
        let args = Args::try_parse_from([
            "stationctl",
            "monitor",
            "--ssid",
            "lab",
            "--interval-secs",
            "3",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Monitor { interval_secs: 3, .. }));
    }
}
