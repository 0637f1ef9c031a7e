//! Transport session for register-addressed device I/O
//!
//! This module defines the [`Transport`] trait the polling core talks
//! through, and [`SerialSession`], the Modbus RTU implementation on top of
//! a serial port. Frames are generated and checked with the `rmodbus`
//! client types; byte I/O goes through `serialport` with a bounded per-call
//! timeout.
//!
//! A session addresses exactly one unit id. `open()` performs a liveness
//! probe (one read of a known-present status register) before declaring
//! success; if the probe fails the just-opened port is dropped and
//! [`ServoScopeError::DeviceUnresponsive`] is returned. No retries happen
//! inside the session; a failed exchange is surfaced as
//! [`ServoScopeError::Transient`] and retry policy belongs to the caller.

use crate::catalog::{Parity, SerialSettings};
use crate::error::{Result, ServoScopeError};
use rmodbus::{client::ModbusRequest, ModbusProto};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Response byte overhead of a read-holding-registers exchange
/// (unit id, function code, byte count, CRC16)
const READ_RESPONSE_OVERHEAD: usize = 5;

/// A write-single-register response echoes the 8-byte request
const WRITE_RESPONSE_LEN: usize = 8;

/// A Modbus exception response is always 5 bytes
const EXCEPTION_FRAME_LEN: usize = 5;

/// Register-level device I/O
///
/// Implemented by [`SerialSession`] for real hardware and by
/// [`MockTransport`](crate::backend::mock::MockTransport) for tests and the
/// demo mode. All calls are synchronous and bounded by the underlying
/// timeout.
pub trait Transport {
    /// Read `count` contiguous 16-bit holding registers starting at `address`
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;

    /// Write one 16-bit register (function code 6)
    fn write_register(&mut self, address: u16, value: u16) -> Result<()>;

    /// Snapshot of the exchange statistics
    fn stats(&self) -> SessionStats;
}

/// Statistics for transport exchanges
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Completed request/response exchanges
    pub successful_exchanges: u64,
    /// Failed exchanges (timeout, CRC, framing, exception)
    pub failed_exchanges: u64,
    /// Total register words read
    pub total_words_read: u64,
    /// Duration of the most recent successful exchange
    pub last_exchange: Duration,
}

impl SessionStats {
    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_exchanges + self.failed_exchanges;
        if total == 0 {
            100.0
        } else {
            (self.successful_exchanges as f64 / total as f64) * 100.0
        }
    }

    /// Record a completed exchange
    pub fn record_success(&mut self, elapsed: Duration, words: usize) {
        self.successful_exchanges += 1;
        self.total_words_read += words as u64;
        self.last_exchange = elapsed;
    }

    /// Record a failed exchange
    pub fn record_failure(&mut self) {
        self.failed_exchanges += 1;
    }
}

/// An open Modbus RTU session over a serial port
pub struct SerialSession {
    port: Box<dyn serialport::SerialPort>,
    port_name: String,
    unit_id: u8,
    stats: SessionStats,
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("port_name", &self.port_name)
            .field("unit_id", &self.unit_id)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl SerialSession {
    /// Open a serial port and probe the device
    ///
    /// The probe reads one known-present status register (from the model
    /// catalog). If the port cannot be opened, `PortUnavailable` is
    /// returned; if the port opens but the probe fails, the port is closed
    /// again and `DeviceUnresponsive` is returned.
    pub fn open(
        port_name: &str,
        unit_id: u8,
        settings: &SerialSettings,
        probe_register: u16,
    ) -> Result<Self> {
        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(map_data_bits(settings.data_bits))
            .parity(map_parity(settings.parity))
            .stop_bits(map_stop_bits(settings.stop_bits))
            .timeout(settings.timeout)
            .open()
            .map_err(|e| ServoScopeError::PortUnavailable {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;

        let mut session = Self {
            port,
            port_name: port_name.to_string(),
            unit_id,
            stats: SessionStats::default(),
        };

        // Liveness probe; dropping the session on failure releases the port
        if let Err(e) = session.read_registers(probe_register, 1) {
            tracing::warn!(port = port_name, error = %e, "liveness probe failed");
            return Err(ServoScopeError::DeviceUnresponsive {
                port: port_name.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::info!(port = port_name, unit_id, "session opened");
        Ok(session)
    }

    /// The platform port name this session was opened on
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// The device unit id addressed by this session
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Close the session, releasing the port
    pub fn close(self) {
        tracing::info!(port = %self.port_name, "session closed");
    }

    fn request(&self) -> ModbusRequest {
        ModbusRequest::new(self.unit_id, ModbusProto::Rtu)
    }

    /// Send a request frame and collect the response
    ///
    /// Reads until `expected` bytes arrived or the port timeout elapses.
    /// An exception response (function code with the high bit set) is
    /// shorter than a data response and truncates the expectation.
    fn exchange(&mut self, frame: &[u8], mut expected: usize) -> Result<Vec<u8>> {
        self.port
            .write_all(frame)
            .map_err(|e| transient("write failed", &e))?;
        self.port
            .flush()
            .map_err(|e| transient("flush failed", &e))?;

        let mut response = vec![0u8; expected];
        let mut filled = 0;
        while filled < expected {
            match self.port.read(&mut response[filled..expected]) {
                Ok(0) => {
                    return Err(ServoScopeError::Transient(
                        "port returned no data".to_string(),
                    ))
                }
                Ok(n) => {
                    filled += n;
                    if filled >= 2 && response[1] & 0x80 != 0 {
                        expected = EXCEPTION_FRAME_LEN;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(ServoScopeError::Transient(format!(
                        "response timed out after {} of {} bytes",
                        filled, expected
                    )))
                }
                Err(e) => return Err(transient("read failed", &e)),
            }
        }
        response.truncate(expected);
        Ok(response)
    }

    fn read_registers_inner(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let mut request = self.request();
        let mut frame = Vec::new();
        request
            .generate_get_holdings(address, count, &mut frame)
            .map_err(|e| transient("bad read request", &e))?;

        let expected = READ_RESPONSE_OVERHEAD + 2 * count as usize;
        let response = self.exchange(&frame, expected)?;

        let mut values = Vec::with_capacity(count as usize);
        request
            .parse_u16(&response, &mut values)
            .map_err(|e| transient("bad read response", &e))?;
        Ok(values)
    }

    fn write_register_inner(&mut self, address: u16, value: u16) -> Result<()> {
        let mut request = self.request();
        let mut frame = Vec::new();
        request
            .generate_set_holding(address, value, &mut frame)
            .map_err(|e| transient("bad write request", &e))?;

        let response = self.exchange(&frame, WRITE_RESPONSE_LEN)?;
        request
            .parse_ok(&response)
            .map_err(|e| transient("bad write response", &e))?;
        Ok(())
    }
}

impl Transport for SerialSession {
    fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let started = Instant::now();
        let result = self.read_registers_inner(address, count);
        match &result {
            Ok(words) => self.stats.record_success(started.elapsed(), words.len()),
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        let started = Instant::now();
        let result = self.write_register_inner(address, value);
        match &result {
            Ok(()) => self.stats.record_success(started.elapsed(), 0),
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    fn stats(&self) -> SessionStats {
        self.stats.clone()
    }
}

fn transient(context: &str, err: &dyn std::fmt::Display) -> ServoScopeError {
    ServoScopeError::Transient(format!("{context}: {err}"))
}

fn map_data_bits(bits: u8) -> serialport::DataBits {
    match bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        _ => serialport::DataBits::Eight,
    }
}

fn map_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    }
}

fn map_stop_bits(bits: u8) -> serialport::StopBits {
    match bits {
        2 => serialport::StopBits::Two,
        _ => serialport::StopBits::One,
    }
}

/// List the serial ports visible on this machine
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => {
            let mut names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
            names.sort();
            names
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to enumerate serial ports");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_success_rate() {
        let mut stats = SessionStats::default();
        assert_eq!(stats.success_rate(), 100.0);

        stats.record_success(Duration::from_millis(3), 4);
        stats.record_success(Duration::from_millis(2), 2);
        stats.record_failure();

        assert_eq!(stats.successful_exchanges, 2);
        assert_eq!(stats.failed_exchanges, 1);
        assert_eq!(stats.total_words_read, 6);
        assert!((stats.success_rate() - 66.66).abs() < 1.0);
    }

    #[test]
    fn test_serial_option_mapping() {
        assert_eq!(map_data_bits(8), serialport::DataBits::Eight);
        assert_eq!(map_data_bits(7), serialport::DataBits::Seven);
        assert_eq!(map_parity(Parity::None), serialport::Parity::None);
        assert_eq!(map_parity(Parity::Even), serialport::Parity::Even);
        assert_eq!(map_stop_bits(1), serialport::StopBits::One);
        assert_eq!(map_stop_bits(2), serialport::StopBits::Two);
    }

    #[test]
    fn test_open_missing_port_is_unavailable() {
        let settings = crate::catalog::catalog_for(crate::catalog::MotorModel::Ihsv57).serial;
        let err = SerialSession::open("/dev/nonexistent-servoscope", 1, &settings, 0x80)
            .expect_err("open should fail");
        assert!(matches!(err, ServoScopeError::PortUnavailable { .. }));
    }
}
