//! Poll cycle driver
//!
//! [`Monitor`] owns the channel set and (while polling) the transport
//! session, and advances every channel by exactly one buffer entry per
//! tick:
//!
//! 1. Plan contiguous register ranges for the active channels.
//! 2. Issue one read per range, sequential, against the session.
//! 3. Merge the returned words into an address → word lookup.
//! 4. Active channels decode their words and append a value; inactive
//!    channels append a gap marker so all buffers stay time-aligned.
//!
//! A failed range read degrades only the channels that depend on it (they
//! receive a gap for that tick); channels on other ranges still get their
//! sample, and the error is surfaced in the returned [`TickReport`]. The
//! session stays open and the next tick retries on its own.
//!
//! The tick is a plain method invoked by the owner's timer loop; there is
//! no background thread, so ticks, user commands, and parameter I/O are
//! naturally serialized on one thread and never interleave on the wire.

use crate::backend::planner::{PollPlanner, RegisterRange};
use crate::backend::transport::{SessionStats, Transport};
use crate::catalog::ModelCatalog;
use crate::config::MonitorConfig;
use crate::error::{Result, ServoScopeError};
use crate::types::Channel;
use std::collections::HashMap;
use std::time::Duration;

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Stopped,
    Running,
}

/// Counters accumulated across ticks
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorStats {
    /// Ticks executed while running
    pub ticks: u64,
    /// Decoded samples appended
    pub samples: u64,
    /// Gap markers appended
    pub gaps: u64,
    /// Range reads that failed
    pub failed_ranges: u64,
}

/// A failed range read within one tick
#[derive(Debug, Clone)]
pub struct RangeError {
    pub range: RegisterRange,
    pub message: String,
}

impl std::fmt::Display for RangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "read {} failed: {}", self.range, self.message)
    }
}

/// Outcome of one [`Monitor::tick`]
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Whether a poll cycle actually ran (false while stopped)
    pub executed: bool,
    /// Channels that received a decoded sample
    pub values: usize,
    /// Channels that received a gap marker
    pub gaps: usize,
    /// Range reads that failed this tick
    pub errors: Vec<RangeError>,
}

impl TickReport {
    fn idle() -> Self {
        Self::default()
    }

    /// True if every planned range read succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Drives the periodic poll cycle over a transport session
pub struct Monitor {
    channels: Vec<Channel>,
    planner: PollPlanner,
    tick_period: Duration,
    state: MonitorState,
    session: Option<Box<dyn Transport>>,
    stats: MonitorStats,
}

impl Monitor {
    /// Create a monitor with an explicit channel set
    pub fn new(channels: Vec<Channel>, config: &MonitorConfig) -> Self {
        Self {
            channels,
            planner: PollPlanner::new(config.gap_threshold),
            tick_period: config.tick_period(),
            state: MonitorState::Stopped,
            session: None,
            stats: MonitorStats::default(),
        }
    }

    /// Create a monitor with one channel per catalog telemetry descriptor
    ///
    /// Channels start inactive with auto-generated colors; activity and
    /// display preferences are applied by the caller.
    pub fn from_catalog(catalog: &ModelCatalog, config: &MonitorConfig) -> Self {
        let channels = catalog
            .telemetry
            .iter()
            .enumerate()
            .map(|(i, desc)| {
                Channel::new(desc.label, desc.registers, desc.signed).with_auto_color(i)
            })
            .collect();
        Self::new(channels, config)
    }

    /// Attach an open transport session
    pub fn connect(&mut self, session: Box<dyn Transport>) {
        self.session = Some(session);
    }

    /// Detach and drop the session
    ///
    /// Stops polling first so the port is never closed under an in-flight
    /// read. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        self.stop();
        if self.session.take().is_some() {
            tracing::info!("transport session detached");
        }
    }

    /// Whether a session is attached
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Exchange statistics of the attached session, if any
    pub fn session_stats(&self) -> Option<SessionStats> {
        self.session.as_deref().map(|s| s.stats())
    }

    /// The configured tick period
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Whether the monitor is polling
    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// Accumulated counters
    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// All channels, in catalog order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Mutable channel access for activity/display toggles
    pub fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    /// Find a channel by name
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|ch| ch.name == name)
    }

    /// Find a channel by name, mutably
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|ch| ch.name == name)
    }

    /// Toggle one channel's activity flag; returns false if the name is
    /// unknown
    pub fn set_channel_active(&mut self, name: &str, active: bool) -> bool {
        match self.channel_mut(name) {
            Some(ch) => {
                ch.set_active(active);
                true
            }
            None => false,
        }
    }

    /// Begin polling
    ///
    /// Requires an attached session. Every channel's buffer is reset so the
    /// first tick starts a fresh, aligned time axis.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Err(ServoScopeError::Session(
                "cannot start monitor: no open session".to_string(),
            ));
        }
        for ch in &mut self.channels {
            ch.reset();
        }
        self.stats = MonitorStats::default();
        self.state = MonitorState::Running;
        tracing::info!("monitor started");
        Ok(())
    }

    /// Stop polling; buffers are left intact for inspection
    ///
    /// Idempotent. No tick runs after this returns, since the tick is a plain
    /// method on the same thread.
    pub fn stop(&mut self) {
        if self.state == MonitorState::Running {
            tracing::info!("monitor stopped");
        }
        self.state = MonitorState::Stopped;
    }

    /// Execute one poll cycle
    ///
    /// A no-op returning an idle report while stopped.
    pub fn tick(&mut self) -> TickReport {
        if self.state != MonitorState::Running {
            return TickReport::idle();
        }
        let Some(session) = self.session.as_mut() else {
            return TickReport::idle();
        };

        let ranges = self.planner.plan(&self.channels);

        let mut lookup: HashMap<u16, u16> = HashMap::new();
        let mut errors = Vec::new();
        for range in &ranges {
            match session.read_registers(range.start, range.count()) {
                Ok(words) => {
                    for (addr, word) in range.addresses().zip(words) {
                        lookup.insert(addr, word);
                    }
                }
                Err(e) => {
                    tracing::warn!(range = %range, error = %e, "range read failed");
                    errors.push(RangeError {
                        range: *range,
                        message: e.to_string(),
                    });
                }
            }
        }

        let mut values = 0;
        let mut gaps = 0;
        for ch in &mut self.channels {
            if !ch.is_active() {
                ch.push_gap();
                gaps += 1;
                continue;
            }

            let words: Option<Vec<u16>> = ch
                .registers()
                .addresses()
                .map(|addr| lookup.get(&addr).copied())
                .collect();

            match words.as_deref().and_then(|w| ch.decode(w)) {
                Some(value) => {
                    ch.push_value(value);
                    values += 1;
                }
                // Words missing because their range failed this tick
                None => {
                    ch.push_gap();
                    gaps += 1;
                }
            }
        }

        self.stats.ticks += 1;
        self.stats.samples += values as u64;
        self.stats.gaps += gaps as u64;
        self.stats.failed_ranges += errors.len() as u64;

        TickReport {
            executed: true,
            values,
            gaps,
            errors,
        }
    }
}
