//! Mock transport for testing and the demo mode
//!
//! Simulates a register-addressed device without hardware: a sparse
//! register map served from memory, a request log for asserting on batching
//! behavior, and per-address failure injection for exercising the poll
//! loop's partial-tick handling.
//!
//! The same type backs the CLI's `--mock` flag, where [`MockTransport::demo`]
//! pre-loads a drive model's registers and [`step`](MockTransport::step)
//! evolves the telemetry values between ticks.

use crate::backend::transport::{SessionStats, Transport};
use crate::catalog::ModelCatalog;
use crate::error::{Result, ServoScopeError};
use crate::types::RegisterSpan;
use std::collections::{HashMap, HashSet};

/// In-memory register-addressed device
#[derive(Debug, Default)]
pub struct MockTransport {
    registers: HashMap<u16, u16>,
    /// Addresses whose enclosing range read (or write) fails
    failing: HashSet<u16>,
    /// Log of `(address, count)` for every read request
    reads: Vec<(u16, u16)>,
    /// Log of `(address, value)` for every successful write
    writes: Vec<(u16, u16)>,
    stats: SessionStats,
    /// Demo phase counter, advanced by [`step`](Self::step)
    phase: u32,
    demo_telemetry: Vec<RegisterSpan>,
    /// Advance the demo waves on every read (set by [`demo`](Self::demo))
    auto_step: bool,
}

impl MockTransport {
    /// Create an empty mock device (unmapped registers read as 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock drive pre-loaded from a model catalog
    ///
    /// Parameter registers get small distinct values; telemetry registers
    /// start at zero and are evolved by [`step`](Self::step).
    pub fn demo(catalog: &ModelCatalog) -> Self {
        let mut mock = Self::new();
        for (i, param) in catalog
            .param_groups
            .iter()
            .flat_map(|g| g.params.iter())
            .enumerate()
        {
            mock.set_register(param.address, 100 + i as u16);
        }
        mock.set_register(catalog.probe_register, 1);
        for desc in catalog.telemetry {
            for addr in desc.registers.addresses() {
                mock.set_register(addr, 0);
            }
            mock.demo_telemetry.push(desc.registers);
        }
        mock.auto_step = true;
        mock
    }

    /// Set one register value
    pub fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }

    /// Builder form of [`set_register`](Self::set_register)
    pub fn with_register(mut self, address: u16, value: u16) -> Self {
        self.set_register(address, value);
        self
    }

    /// Current value of one register
    pub fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    /// Make any exchange touching `address` fail with a transient error
    pub fn fail_address(&mut self, address: u16) {
        self.failing.insert(address);
    }

    /// Clear all injected failures
    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Read requests issued so far, as `(address, count)`
    pub fn reads(&self) -> &[(u16, u16)] {
        &self.reads
    }

    /// Successful writes so far, as `(address, value)`
    pub fn writes(&self) -> &[(u16, u16)] {
        &self.writes
    }

    /// Forget the request logs
    pub fn clear_log(&mut self) {
        self.reads.clear();
        self.writes.clear();
    }

    /// Advance the demo telemetry one step (triangle waves of differing
    /// periods so every channel moves visibly)
    pub fn step(&mut self) {
        self.phase = self.phase.wrapping_add(1);
        let spans = self.demo_telemetry.clone();
        for (i, span) in spans.iter().enumerate() {
            let period = 200 + 40 * i as u32;
            let half = period / 2;
            let pos = self.phase % period;
            let value = if pos < half { pos } else { period - pos } as u16;
            match span {
                RegisterSpan::Single(addr) => self.set_register(*addr, value),
                RegisterSpan::Double(addr) => {
                    self.set_register(*addr, 0);
                    self.set_register(addr + 1, value);
                }
            }
        }
    }
}

impl Transport for MockTransport {
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.reads.push((address, count));
        if self.auto_step {
            self.step();
        }

        let addresses: Vec<u16> = (0..count).map(|i| address.wrapping_add(i)).collect();
        if addresses.iter().any(|a| self.failing.contains(a)) {
            self.stats.record_failure();
            return Err(ServoScopeError::Transient(format!(
                "injected failure reading 0x{address:02X}+{count}"
            )));
        }

        self.stats
            .record_success(std::time::Duration::ZERO, count as usize);
        Ok(addresses.iter().map(|a| self.register(*a)).collect())
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        if self.failing.contains(&address) {
            self.stats.record_failure();
            return Err(ServoScopeError::Transient(format!(
                "injected failure writing 0x{address:02X}"
            )));
        }
        self.set_register(address, value);
        self.writes.push((address, value));
        self.stats.record_success(std::time::Duration::ZERO, 0);
        Ok(())
    }

    fn stats(&self) -> SessionStats {
        self.stats.clone()
    }
}
