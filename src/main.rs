//! servoscope - Command line entry point
//!
//! Thin CLI over the polling core: enumerate ports, dump or write
//! configuration registers, and run the telemetry monitor with an optional
//! CSV export. `--mock` substitutes a simulated drive so everything can be
//! exercised without hardware.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use servoscope::backend::{self, params, MockTransport, Monitor, SerialSession, Transport};
use servoscope::catalog::{catalog_for, MotorModel};
use servoscope::config::Preferences;
use servoscope::types::Sample;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "servoscope", version, about = "Modbus RTU servo drive monitor")]
struct Cli {
    /// Serial port (defaults to the saved preference)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Modbus unit id of the drive (defaults to the saved preference)
    #[arg(long, global = true)]
    unit_id: Option<u8>,

    /// Drive model
    #[arg(long, global = true, default_value = "ihsv57")]
    model: MotorModel,

    /// Use a simulated drive instead of real hardware
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports visible on this machine
    ListPorts,
    /// Read and print every configuration register group
    Params,
    /// Write one configuration register
    Write {
        /// Register address (decimal or 0x-prefixed hex)
        address: String,
        /// Value in display units (decimal scaling is applied)
        value: String,
    },
    /// Poll telemetry and print a summary
    Monitor {
        /// How long to poll
        #[arg(long, default_value_t = 10.0)]
        duration_secs: f64,

        /// Export the sample buffers as CSV when done
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Comma-separated channel names to activate (default: all)
        #[arg(long)]
        channels: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,servoscope=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let prefs = Preferences::load_or_default();

    match &cli.command {
        Command::ListPorts => list_ports(),
        Command::Params => read_params(&cli, &prefs),
        Command::Write { address, value } => write_param(&cli, &prefs, address, value),
        Command::Monitor {
            duration_secs,
            csv,
            channels,
        } => run_monitor(&cli, prefs, *duration_secs, csv.as_deref(), channels.as_deref()),
    }
}

/// Open the transport selected by the CLI flags
///
/// Returns the transport and, for real hardware, the port name used.
fn open_transport(cli: &Cli, prefs: &Preferences) -> anyhow::Result<(Box<dyn Transport>, Option<String>)> {
    let catalog = catalog_for(cli.model);
    if cli.mock {
        tracing::info!(model = %cli.model, "using simulated drive");
        return Ok((Box::new(MockTransport::demo(catalog)), None));
    }

    let port = cli
        .port
        .clone()
        .or_else(|| prefs.selected_port.clone())
        .context("no serial port selected; pass --port or see `servoscope list-ports`")?;
    let unit_id = cli.unit_id.unwrap_or(prefs.unit_id);

    let session = SerialSession::open(&port, unit_id, &catalog.serial, catalog.probe_register)?;
    Ok((Box::new(session), Some(port)))
}

fn list_ports() -> anyhow::Result<()> {
    let ports = backend::available_ports();
    if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for port in ports {
            println!("{port}");
        }
    }
    Ok(())
}

fn read_params(cli: &Cli, prefs: &Preferences) -> anyhow::Result<()> {
    let catalog = catalog_for(cli.model);
    let (mut transport, _) = open_transport(cli, prefs)?;

    for group in catalog.param_groups {
        println!("{}", group.name);
        for descriptor in group.params {
            let raw = params::read_param(transport.as_mut(), descriptor)
                .with_context(|| format!("reading 0x{:02X}", descriptor.address))?;
            println!(
                "  0x{:02X}  {:>8}  {}",
                descriptor.address,
                params::format_value(raw, descriptor.decimal_place),
                descriptor.label
            );
        }
    }
    Ok(())
}

fn write_param(cli: &Cli, prefs: &Preferences, address: &str, value: &str) -> anyhow::Result<()> {
    let catalog = catalog_for(cli.model);
    let address = parse_address(address)?;
    let descriptor = catalog
        .find_param(address)
        .with_context(|| format!("0x{address:02X} is not a known {} parameter", cli.model))?;

    let (mut transport, _) = open_transport(cli, prefs)?;
    let raw = params::write_param(transport.as_mut(), descriptor, value)?;
    println!(
        "Wrote {} (raw {raw}) to 0x{:02X} {}",
        params::format_value(raw, descriptor.decimal_place),
        descriptor.address,
        descriptor.label
    );
    Ok(())
}

fn run_monitor(
    cli: &Cli,
    mut prefs: Preferences,
    duration_secs: f64,
    csv: Option<&std::path::Path>,
    channels: Option<&str>,
) -> anyhow::Result<()> {
    let catalog = catalog_for(cli.model);
    let mut monitor = Monitor::from_catalog(catalog, &prefs.monitor);
    prefs.apply_to(monitor.channels_mut());

    if let Some(list) = channels {
        for ch in monitor.channels_mut() {
            ch.set_active(false);
        }
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !monitor.set_channel_active(name, true) {
                bail!("unknown channel '{name}'");
            }
        }
    } else if monitor.channels().iter().all(|ch| !ch.is_active()) {
        // Nothing saved, nothing selected: watch everything
        for ch in monitor.channels_mut() {
            ch.set_active(true);
        }
    }

    let (transport, port) = open_transport(cli, &prefs)?;
    monitor.connect(transport);
    monitor.start()?;

    let period = monitor.tick_period();
    let deadline = Instant::now() + Duration::from_secs_f64(duration_secs);
    let mut last_tick = Instant::now();
    let mut dirty_ticks = 0u64;

    while Instant::now() < deadline {
        let report = monitor.tick();
        if !report.is_clean() {
            dirty_ticks += 1;
        }

        // Keep the tick cadence without drifting on fast ticks
        let elapsed = last_tick.elapsed();
        if elapsed < period {
            std::thread::sleep(period - elapsed);
        }
        last_tick = Instant::now();
    }

    monitor.stop();

    let stats = monitor.stats();
    tracing::info!(
        ticks = stats.ticks,
        samples = stats.samples,
        gaps = stats.gaps,
        failed_ranges = stats.failed_ranges,
        dirty_ticks,
        "monitor finished"
    );
    if let Some(session) = monitor.session_stats() {
        tracing::info!(
            exchanges = session.successful_exchanges,
            failed = session.failed_exchanges,
            success_rate = %format_args!("{:.1}%", session.success_rate()),
            "session statistics"
        );
    }

    if let Some(path) = csv {
        export_csv(&monitor, path)?;
        println!("Wrote {}", path.display());
    }

    if let Some(port) = port {
        prefs.selected_port = Some(port);
        if let Some(unit_id) = cli.unit_id {
            prefs.unit_id = unit_id;
        }
        prefs.capture(monitor.channels());
        if let Err(e) = prefs.save() {
            tracing::warn!(error = %e, "failed to save preferences");
        }
    }

    monitor.disconnect();
    Ok(())
}

/// Export all channel buffers as CSV, one row per tick
///
/// Gaps become empty cells.
fn export_csv(monitor: &Monitor, path: &std::path::Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);

    writeln!(
        out,
        "# servoscope {} exported {}",
        env!("CARGO_PKG_VERSION"),
        chrono::Local::now().to_rfc3339()
    )?;

    let names: Vec<&str> = monitor.channels().iter().map(|ch| ch.name.as_str()).collect();
    writeln!(out, "tick,{}", names.join(","))?;

    let snapshots: Vec<Vec<Sample>> = monitor
        .channels()
        .iter()
        .map(|ch| ch.buffer().snapshot())
        .collect();
    let rows = snapshots.iter().map(|s| s.len()).max().unwrap_or(0);

    for row in 0..rows {
        write!(out, "{row}")?;
        for snapshot in &snapshots {
            match snapshot.get(row).and_then(|s| s.value()) {
                Some(v) => write!(out, ",{v}")?,
                None => write!(out, ",")?,
            }
        }
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}

/// Parse a register address given as decimal or 0x-prefixed hex
fn parse_address(text: &str) -> anyhow::Result<u16> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.with_context(|| format!("'{text}' is not a register address"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x50").unwrap(), 0x50);
        assert_eq!(parse_address("0X3A").unwrap(), 0x3A);
        assert_eq!(parse_address("80").unwrap(), 80);
        assert!(parse_address("zz").is_err());
    }

    #[test]
    fn test_cli_parses_monitor_command() {
        let cli = Cli::parse_from([
            "servoscope",
            "--mock",
            "monitor",
            "--duration-secs",
            "2.5",
            "--channels",
            "Real Pos,Pos Error",
        ]);
        assert!(cli.mock);
        match cli.command {
            Command::Monitor {
                duration_secs,
                channels,
                ..
            } => {
                assert_eq!(duration_secs, 2.5);
                assert_eq!(channels.as_deref(), Some("Real Pos,Pos Error"));
            }
            _ => panic!("expected monitor command"),
        }
    }
}
