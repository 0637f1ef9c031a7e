//! Static register catalog for supported drive models
//!
//! Each supported motor model contributes one [`ModelCatalog`]: serial link
//! settings, the liveness-probe register, the configuration-register table
//! (grouped, with per-register decimal scaling), and the telemetry channel
//! descriptors. The registry is table-driven and queried by [`MotorModel`]
//! value; adding a model is a data addition, not a new code path.
//!
//! The polling core treats all of this as read-only lookup data.

use crate::error::{Result, ServoScopeError};
use crate::types::RegisterSpan;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported drive models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MotorModel {
    /// JMC iHSV57 integrated servo
    #[default]
    Ihsv57,
}

impl MotorModel {
    /// All known models
    pub fn all() -> &'static [MotorModel] {
        &[MotorModel::Ihsv57]
    }
}

impl std::fmt::Display for MotorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotorModel::Ihsv57 => write!(f, "iHSV57"),
        }
    }
}

impl std::str::FromStr for MotorModel {
    type Err = ServoScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ihsv57" => Ok(MotorModel::Ihsv57),
            other => Err(ServoScopeError::Catalog(format!(
                "unknown motor model '{other}'"
            ))),
        }
    }
}

/// Parity for the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Serial link settings for one drive model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// Per-call read/write timeout
    pub timeout: Duration,
}

/// One configuration register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub address: u16,
    pub label: &'static str,
    /// Decimal places for display scaling; 0 = raw integer
    pub decimal_place: u8,
}

/// A named group of configuration registers
#[derive(Debug, Clone, Copy)]
pub struct ParamGroup {
    pub name: &'static str,
    pub params: &'static [ParamDescriptor],
}

/// One telemetry channel the drive exposes
#[derive(Debug, Clone, Copy)]
pub struct TelemetryDescriptor {
    pub label: &'static str,
    pub registers: RegisterSpan,
    /// Whether a single-register value is 16-bit two's complement
    pub signed: bool,
}

/// Everything the core needs to talk to one drive model
#[derive(Debug, Clone, Copy)]
pub struct ModelCatalog {
    pub model: MotorModel,
    pub serial: SerialSettings,
    /// Known-present status register used as the open() liveness probe
    pub probe_register: u16,
    pub param_groups: &'static [ParamGroup],
    pub telemetry: &'static [TelemetryDescriptor],
}

impl ModelCatalog {
    /// Find a configuration register by address across all groups
    pub fn find_param(&self, address: u16) -> Option<&'static ParamDescriptor> {
        self.param_groups
            .iter()
            .flat_map(|g| g.params.iter())
            .find(|d| d.address == address)
    }

    /// Total number of configuration registers
    pub fn param_count(&self) -> usize {
        self.param_groups.iter().map(|g| g.params.len()).sum()
    }
}

const fn param(address: u16, label: &'static str) -> ParamDescriptor {
    ParamDescriptor {
        address,
        label,
        decimal_place: 0,
    }
}

const IHSV57_CONTROL: &[ParamDescriptor] = &[
    param(0x06, "Control Mode"),
    param(0x07, "Control Mode Signal"),
    param(0x08, "Mode 2"),
    param(0x0A, "Motor/Encoder: Line"),
    param(0x31, "Input offset"),
    param(0x32, "Simulation command weighted coefficient"),
    param(0x46, "Electronic gear: Nominator"),
    param(0x47, "Electronic gear: Denominator"),
];

const IHSV57_POSITION: &[ParamDescriptor] = &[
    param(0x40, "Pp"),
    param(0x41, "Pd"),
    param(0x42, "Pff"),
    param(0x45, "Pos Filter"),
    param(0x48, "Pos Error"),
];

const IHSV57_VELOCITY: &[ParamDescriptor] = &[
    param(0x50, "Vp"),
    param(0x51, "Vi"),
    param(0x52, "Vd"),
    param(0x53, "Aff"),
    param(0x54, "Vel Filter"),
    param(0x55, "Continuous Vel"),
    param(0x56, "Vel Limit"),
    param(0x57, "Acc"),
    param(0x58, "Dec"),
];

const IHSV57_CURRENT: &[ParamDescriptor] = &[
    param(0x60, "Cp"),
    param(0x61, "Ci"),
    param(0x62, "Continuous Current"),
    param(0x63, "Limit Current"),
];

const IHSV57_PROTECTION: &[ParamDescriptor] = &[
    param(0x3A, "Temp Limit"),
    param(0x3B, "Over Voltage Limit"),
    param(0x3C, "Under Voltage Limit"),
    param(0x3D, "I2T Limit"),
];

const IHSV57_PARAM_GROUPS: &[ParamGroup] = &[
    ParamGroup {
        name: "Control",
        params: IHSV57_CONTROL,
    },
    ParamGroup {
        name: "Position loop",
        params: IHSV57_POSITION,
    },
    ParamGroup {
        name: "Velocity loop",
        params: IHSV57_VELOCITY,
    },
    ParamGroup {
        name: "Current loop",
        params: IHSV57_CURRENT,
    },
    ParamGroup {
        name: "Protection",
        params: IHSV57_PROTECTION,
    },
];

const IHSV57_TELEMETRY: &[TelemetryDescriptor] = &[
    TelemetryDescriptor {
        label: "Pos Cmd",
        registers: RegisterSpan::Double(0x85),
        signed: false,
    },
    TelemetryDescriptor {
        label: "Real Pos",
        registers: RegisterSpan::Double(0x87),
        signed: false,
    },
    TelemetryDescriptor {
        label: "Pos Error",
        registers: RegisterSpan::Single(0x89),
        signed: true,
    },
    TelemetryDescriptor {
        label: "Vel Cmd [Rpm]",
        registers: RegisterSpan::Single(0x90),
        signed: true,
    },
    TelemetryDescriptor {
        label: "Real Vel [Rpm]",
        registers: RegisterSpan::Single(0x91),
        signed: true,
    },
    TelemetryDescriptor {
        label: "Vel Error [Rpm]",
        registers: RegisterSpan::Single(0x92),
        signed: true,
    },
    TelemetryDescriptor {
        label: "Torque Current Cmd",
        registers: RegisterSpan::Single(0xA0),
        signed: true,
    },
    TelemetryDescriptor {
        label: "Real Torque Current",
        registers: RegisterSpan::Single(0xA1),
        signed: true,
    },
];

const IHSV57: ModelCatalog = ModelCatalog {
    model: MotorModel::Ihsv57,
    serial: SerialSettings {
        baud_rate: 57_600,
        data_bits: 8,
        parity: Parity::None,
        stop_bits: 1,
        timeout: Duration::from_millis(500),
    },
    probe_register: 0x80,
    param_groups: IHSV57_PARAM_GROUPS,
    telemetry: IHSV57_TELEMETRY,
};

/// Look up the catalog for a model
pub fn catalog_for(model: MotorModel) -> &'static ModelCatalog {
    match model {
        MotorModel::Ihsv57 => &IHSV57,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let cat = catalog_for(MotorModel::Ihsv57);
        assert_eq!(cat.model, MotorModel::Ihsv57);
        assert_eq!(cat.serial.baud_rate, 57_600);
        assert_eq!(cat.probe_register, 0x80);
    }

    #[test]
    fn test_telemetry_table() {
        let cat = catalog_for(MotorModel::Ihsv57);
        assert_eq!(cat.telemetry.len(), 8);

        let real_pos = &cat.telemetry[1];
        assert_eq!(real_pos.registers, RegisterSpan::Double(0x87));
        assert!(!real_pos.signed);

        let real_vel = &cat.telemetry[4];
        assert_eq!(real_vel.registers, RegisterSpan::Single(0x91));
        assert!(real_vel.signed);
    }

    #[test]
    fn test_find_param() {
        let cat = catalog_for(MotorModel::Ihsv57);
        let vp = cat.find_param(0x50).expect("Vp present");
        assert_eq!(vp.label, "Vp");
        assert!(cat.find_param(0xFE).is_none());
    }

    #[test]
    fn test_param_addresses_unique() {
        let cat = catalog_for(MotorModel::Ihsv57);
        let mut addrs: Vec<u16> = cat
            .param_groups
            .iter()
            .flat_map(|g| g.params.iter().map(|p| p.address))
            .collect();
        let total = addrs.len();
        addrs.sort_unstable();
        addrs.dedup();
        assert_eq!(addrs.len(), total, "duplicate parameter address");
        assert_eq!(total, cat.param_count());
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!("ihsv57".parse::<MotorModel>().unwrap(), MotorModel::Ihsv57);
        assert!("ihsv99".parse::<MotorModel>().is_err());
    }
}
