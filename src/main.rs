//! `th02` command line tool.
//!
//! ```bash
//! th02 read --channel all --count 5 --interval-ms 1000
//! th02 --config config/th02.toml read --simulate
//! RUST_LOG=th02_daq=debug th02 read --channel temperature
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use th02_daq::config::{Settings, DEFAULT_CONFIG_PATH};
use th02_daq::transport::{BusTransport, MockBus};
use th02_daq::{logging, ChannelType, ProcessedReadout, Th02Device};

#[derive(Parser, Debug)]
#[command(name = "th02", version, about = "Read a TH02 temperature/humidity sensor")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run acquisitions and print processed values
    Read {
        /// Channel to read
        #[arg(long, value_enum, default_value_t = ChannelArg::All)]
        channel: ChannelArg,
        /// Number of rounds
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Pause between rounds in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Use a simulated sensor instead of the configured bus
        #[arg(long)]
        simulate: bool,
    },
    /// List the channels a device exposes
    Channels,
    /// Print the effective configuration
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelArg {
    Temperature,
    Humidity,
    All,
}

impl ChannelArg {
    fn channels(self) -> Vec<ChannelType> {
        match self {
            ChannelArg::Temperature => vec![ChannelType::Temperature],
            ChannelArg::Humidity => vec![ChannelType::Humidity],
            ChannelArg::All => ChannelType::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    logging::init(&settings);

    match cli.command {
        Command::Read {
            channel,
            count,
            interval_ms,
            simulate,
        } => read(&settings, channel, count, Duration::from_millis(interval_ms), simulate).await,
        Command::Channels => {
            let device = Th02Device::from_settings(&settings, MockBus::new(settings.device.address));
            for spec in device.channels() {
                println!("{:?}: {:?}", spec.kind, spec.info);
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}

fn open_transport(settings: &Settings, simulate: bool) -> Result<Box<dyn BusTransport>> {
    if simulate {
        info!(address = settings.device.address, "using simulated sensor");
        return Ok(Box::new(MockBus::new(settings.device.address).with_busy_polls(3)));
    }

    #[cfg(feature = "linux_i2c")]
    {
        let bus = th02_daq::transport::linux::open(&settings.device.bus, settings.device.address)?;
        Ok(Box::new(bus))
    }

    #[cfg(not(feature = "linux_i2c"))]
    {
        bail!(
            "Bus access to '{}' is not enabled. Rebuild with --features linux_i2c or pass --simulate",
            settings.device.bus
        )
    }
}

async fn read(
    settings: &Settings,
    channel: ChannelArg,
    count: u32,
    interval: Duration,
    simulate: bool,
) -> Result<()> {
    let bus = open_transport(settings, simulate)?;
    let device = Arc::new(Th02Device::from_settings(settings, bus));
    let channels = channel.channels();

    for round in 0..count {
        if round > 0 {
            tokio::time::sleep(interval).await;
        }

        // One task per request; the device guard serializes them.
        let tasks: Vec<_> = channels
            .iter()
            .map(|&channel| {
                let device = device.clone();
                tokio::spawn(async move { (channel, device.acquire_reading(channel).await) })
            })
            .collect();

        for joined in futures::future::join_all(tasks).await {
            let (channel, result) = joined.context("acquisition task panicked")?;
            match result {
                Ok(reading) => {
                    let note = if reading.settled { "" } else { " (not settled)" };
                    println!("{}: {} {}{}", channel, reading.value, channel.unit(), note);
                }
                Err(e) => {
                    if count == 1 {
                        bail!("{} read failed: {}", channel, e);
                    }
                    eprintln!("{} read failed: {}", channel, e);
                }
            }
        }
    }

    Ok(())
}
