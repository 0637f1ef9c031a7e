//! Parameter register I/O
//!
//! The configuration-register path is deliberately separate from the
//! batching pipeline: it runs on explicit user action, one register per
//! request, so there is nothing to amortize. Reads walk a catalog group in
//! order; writes parse the user's text, apply inverse decimal scaling, and
//! issue a single function-code-6 write.

use crate::backend::transport::Transport;
use crate::catalog::{ModelCatalog, ParamDescriptor, ParamGroup};
use crate::error::{Result, ServoScopeError};

/// Read one configuration register
pub fn read_param(transport: &mut dyn Transport, descriptor: &ParamDescriptor) -> Result<u16> {
    let words = transport.read_registers(descriptor.address, 1)?;
    words.first().copied().ok_or_else(|| {
        ServoScopeError::Transient(format!(
            "empty response reading 0x{:02X}",
            descriptor.address
        ))
    })
}

/// Read a whole parameter group, in descriptor order
///
/// Stops at the first failed read; a partial parameter table is more
/// confusing than an error.
pub fn read_group(transport: &mut dyn Transport, group: &ParamGroup) -> Result<Vec<u16>> {
    group
        .params
        .iter()
        .map(|descriptor| read_param(&mut *transport, descriptor))
        .collect()
}

/// Read every parameter group of a model
pub fn read_all(
    transport: &mut dyn Transport,
    catalog: &ModelCatalog,
) -> Result<Vec<(&'static str, Vec<u16>)>> {
    catalog
        .param_groups
        .iter()
        .map(|group| Ok((group.name, read_group(&mut *transport, group)?)))
        .collect()
}

/// Scale a raw register value for display
pub fn scale_for_display(raw: u16, decimal_place: u8) -> f64 {
    raw as f64 / 10f64.powi(decimal_place as i32)
}

/// Format a raw register value with its decimal scaling
pub fn format_value(raw: u16, decimal_place: u8) -> String {
    format!(
        "{:.*}",
        decimal_place as usize,
        scale_for_display(raw, decimal_place)
    )
}

/// Parse user text into a raw register value
///
/// Applies inverse decimal scaling (`raw = round(input * 10^dp)`) and
/// rejects non-numeric input and values that do not fit a 16-bit register.
pub fn parse_input(text: &str, decimal_place: u8) -> Result<u16> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ServoScopeError::Validation(format!("'{trimmed}' is not a number")))?;

    let raw = (value * 10f64.powi(decimal_place as i32)).round();
    if !(0.0..=u16::MAX as f64).contains(&raw) {
        return Err(ServoScopeError::Validation(format!(
            "'{trimmed}' is out of register range"
        )));
    }
    Ok(raw as u16)
}

/// Validate, scale, and write one configuration register
///
/// Returns the raw value written. Validation failures leave the device
/// untouched.
pub fn write_param(
    transport: &mut dyn Transport,
    descriptor: &ParamDescriptor,
    text: &str,
) -> Result<u16> {
    let raw = parse_input(text, descriptor.decimal_place)?;
    transport.write_register(descriptor.address, raw)?;
    tracing::info!(
        address = %format_args!("0x{:02X}", descriptor.address),
        label = descriptor.label,
        raw,
        "parameter written"
    );
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockTransport;
    use crate::catalog::{catalog_for, MotorModel};

    fn descriptor(address: u16, decimal_place: u8) -> ParamDescriptor {
        ParamDescriptor {
            address,
            label: "test",
            decimal_place,
        }
    }

    #[test]
    fn test_decimal_scaling_round_trip() {
        // Writing display value 12.5 at one decimal place stores raw 125
        assert_eq!(parse_input("12.5", 1).unwrap(), 125);
        // Reading raw 125 back yields display 12.5
        assert_eq!(scale_for_display(125, 1), 12.5);
        assert_eq!(format_value(125, 1), "12.5");
    }

    #[test]
    fn test_unscaled_values_pass_through() {
        assert_eq!(parse_input("1500", 0).unwrap(), 1500);
        assert_eq!(format_value(1500, 0), "1500");
    }

    #[test]
    fn test_parse_rejects_junk() {
        assert!(matches!(
            parse_input("fast", 0),
            Err(ServoScopeError::Validation(_))
        ));
        assert!(parse_input("", 0).is_err());
        assert!(parse_input("-1", 0).is_err());
        assert!(parse_input("70000", 0).is_err());
    }

    #[test]
    fn test_parse_rounds() {
        assert_eq!(parse_input("12.34", 1).unwrap(), 123);
        assert_eq!(parse_input("12.36", 1).unwrap(), 124);
    }

    #[test]
    fn test_write_param() {
        let mut mock = MockTransport::new();
        let d = descriptor(0x50, 0);

        let raw = write_param(&mut mock, &d, " 90 ").unwrap();
        assert_eq!(raw, 90);
        assert_eq!(mock.writes(), &[(0x50, 90)]);
    }

    #[test]
    fn test_write_param_validation_skips_device() {
        let mut mock = MockTransport::new();
        let d = descriptor(0x50, 0);

        assert!(write_param(&mut mock, &d, "abc").is_err());
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_read_group_order() {
        let catalog = catalog_for(MotorModel::Ihsv57);
        let group = &catalog.param_groups[3]; // Current loop
        let mut mock = MockTransport::new();
        for (i, p) in group.params.iter().enumerate() {
            mock.set_register(p.address, 10 + i as u16);
        }

        let values = read_group(&mut mock, group).unwrap();
        assert_eq!(values, vec![10, 11, 12, 13]);
        // One request per register, no batching on this path
        assert_eq!(mock.reads().len(), group.params.len());
        assert!(mock.reads().iter().all(|&(_, count)| count == 1));
    }

    #[test]
    fn test_read_group_stops_on_failure() {
        let catalog = catalog_for(MotorModel::Ihsv57);
        let group = &catalog.param_groups[3];
        let mut mock = MockTransport::new();
        mock.fail_address(group.params[1].address);

        assert!(read_group(&mut mock, group).is_err());
        // The failing read aborts the walk
        assert_eq!(mock.reads().len(), 2);
    }

    #[test]
    fn test_read_all_groups() {
        let catalog = catalog_for(MotorModel::Ihsv57);
        let mut mock = MockTransport::demo(catalog);
        mock.clear_log();

        let all = read_all(&mut mock, catalog).unwrap();
        assert_eq!(all.len(), catalog.param_groups.len());
        let total: usize = all.iter().map(|(_, values)| values.len()).sum();
        assert_eq!(total, catalog.param_count());
    }
}
