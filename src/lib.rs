//! # servoscope: Modbus RTU servo drive monitor
//!
//! Polls an iHSV-style integrated servo drive over Modbus RTU and keeps a
//! rolling time-series buffer per telemetry channel. The rendering frontend
//! is a separate concern; this crate is the polling core: batch planning,
//! decoding, buffering, and the transport session lifecycle.
//!
//! ## Architecture
//!
//! - **Planner**: merges the active channels' register addresses into a
//!   minimal set of contiguous range reads (small gaps are read and
//!   discarded to save round-trips)
//! - **Monitor**: drives the periodic poll cycle; every tick each channel
//!   gains exactly one buffer entry (a decoded sample or a gap marker)
//!   so all channels share one time axis
//! - **Transport**: a trait over "read N registers / write one register",
//!   implemented for real hardware (`serialport` + `rmodbus`) and by a
//!   mock device for tests and the demo mode
//! - **Catalog**: static per-model registry of serial settings, parameter
//!   registers, and telemetry descriptors
//!
//! Everything runs on one thread: the monitor's `tick()` is a cooperative
//! callback, so device I/O is naturally serialized without locks.
//!
//! ## Example
//!
//! ```no_run
//! use servoscope::backend::{Monitor, SerialSession};
//! use servoscope::catalog::{catalog_for, MotorModel};
//! use servoscope::config::MonitorConfig;
//!
//! # fn main() -> servoscope::Result<()> {
//! let catalog = catalog_for(MotorModel::Ihsv57);
//! let session = SerialSession::open(
//!     "/dev/ttyUSB0",
//!     1,
//!     &catalog.serial,
//!     catalog.probe_register,
//! )?;
//!
//! let mut monitor = Monitor::from_catalog(catalog, &MonitorConfig::default());
//! monitor.set_channel_active("Real Vel [Rpm]", true);
//! monitor.connect(Box::new(session));
//! monitor.start()?;
//!
//! loop {
//!     let _report = monitor.tick();
//!     // render channel buffers, sleep one tick period, ...
//!     # break;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use backend::{MockTransport, Monitor, PollPlanner, SerialSession, Transport};
pub use catalog::{catalog_for, ModelCatalog, MotorModel};
pub use config::{MonitorConfig, Preferences};
pub use error::{Result, ServoScopeError};
pub use types::{Channel, RegisterSpan, Sample, SampleBuffer, WINDOW};
