//! Polling backend: transport session, batch planner, poll cycle driver
//!
//! All device I/O runs through here. The pieces, leaves first:
//!
//! - [`transport`] - the [`Transport`] trait plus [`SerialSession`], the
//!   Modbus RTU implementation with the open/probe/close lifecycle
//! - [`mock`] - [`MockTransport`], a simulated device for tests and the
//!   CLI demo mode
//! - [`planner`] - [`PollPlanner`] turns active channels into merged
//!   contiguous register ranges
//! - [`monitor`] - [`Monitor`] drives the periodic poll cycle and feeds
//!   the channel buffers
//! - [`params`] - the separate, non-batched configuration-register path
//!
//! Everything is synchronous and single-threaded: the monitor's `tick()`
//! is a cooperative callback invoked from the owner's timer loop, so ticks
//! and parameter I/O never interleave on the wire.

pub mod mock;
pub mod monitor;
pub mod params;
pub mod planner;
pub mod transport;

pub use mock::MockTransport;
pub use monitor::{Monitor, MonitorState, MonitorStats, RangeError, TickReport};
pub use planner::{PollPlanner, RegisterRange, DEFAULT_GAP_THRESHOLD};
pub use transport::{available_ports, SerialSession, SessionStats, Transport};
