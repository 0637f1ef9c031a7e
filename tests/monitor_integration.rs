//! Integration tests for the poll cycle
//!
//! These tests run the full monitor pipeline against a simulated drive:
//! catalog-driven channel construction, batch planning, range reads,
//! decoding, gap alignment, and the start/stop lifecycle.

mod common;

use common::SharedTransport;
use servoscope::backend::{MockTransport, Monitor};
use servoscope::catalog::{catalog_for, MotorModel};
use servoscope::config::MonitorConfig;
use servoscope::types::WINDOW;

/// A monitor over the full iHSV57 telemetry set with every channel active
fn full_monitor() -> Monitor {
    let catalog = catalog_for(MotorModel::Ihsv57);
    let mut monitor = Monitor::from_catalog(catalog, &MonitorConfig::default());
    for ch in monitor.channels_mut() {
        ch.set_active(true);
    }
    monitor
}

#[test]
fn test_full_cycle_batches_reads() {
    let mut monitor = full_monitor();
    let (transport, mock) = SharedTransport::new(
        MockTransport::new()
            .with_register(0x87, 0xFFFF)
            .with_register(0x88, 0xFFFF)
            .with_register(0x91, 0x0064),
    );
    monitor.connect(transport);
    monitor.start().unwrap();

    for _ in 0..5 {
        let report = monitor.tick();
        assert!(report.is_clean());
        assert_eq!(report.values, monitor.channels().len());
    }

    // The whole telemetry set collapses into three ranges per tick:
    // the position block, the velocity block, and the torque block.
    let mock = mock.borrow();
    assert_eq!(mock.reads().len(), 15);
    for tick_reads in mock.reads().chunks(3) {
        assert_eq!(tick_reads[0], (0x85, 5));
        assert_eq!(tick_reads[1], (0x90, 3));
        assert_eq!(tick_reads[2], (0xA0, 2));
    }

    // Decoded values arrived where expected
    assert_eq!(
        monitor
            .channel("Real Pos")
            .unwrap()
            .buffer()
            .latest()
            .unwrap()
            .value(),
        Some(-1.0)
    );
    assert_eq!(
        monitor
            .channel("Real Vel [Rpm]")
            .unwrap()
            .buffer()
            .latest()
            .unwrap()
            .value(),
        Some(100.0)
    );
}

#[test]
fn test_partial_range_failure_keeps_alignment() {
    let mut monitor = full_monitor();
    let mut device = MockTransport::new().with_register(0x89, 0x0005);
    device.fail_address(0xA0);
    let (transport, mock) = SharedTransport::new(device);
    monitor.connect(transport);
    monitor.start().unwrap();

    let report = monitor.tick();
    assert_eq!(report.errors.len(), 1);

    // Channels on the healthy range got samples, the torque channels gaps,
    // and every buffer advanced exactly once.
    assert_eq!(
        monitor
            .channel("Pos Error")
            .unwrap()
            .buffer()
            .latest()
            .unwrap()
            .value(),
        Some(5.0)
    );
    assert!(monitor
        .channel("Real Torque Current")
        .unwrap()
        .buffer()
        .latest()
        .unwrap()
        .is_gap());
    assert!(monitor.channels().iter().all(|ch| ch.buffer().len() == 1));

    // The fault clears on its own the next tick
    mock.borrow_mut().clear_failures();
    let report = monitor.tick();
    assert!(report.is_clean());
    assert!(!monitor
        .channel("Real Torque Current")
        .unwrap()
        .buffer()
        .latest()
        .unwrap()
        .is_gap());
}

#[test]
fn test_stop_halts_io_deterministically() {
    let mut monitor = full_monitor();
    let (transport, mock) = SharedTransport::new(MockTransport::new());
    monitor.connect(transport);
    monitor.start().unwrap();

    monitor.tick();
    monitor.tick();
    monitor.stop();
    let reads_after_stop = mock.borrow().reads().len();

    let report = monitor.tick();
    assert!(!report.executed);
    assert_eq!(mock.borrow().reads().len(), reads_after_stop);

    // History stays inspectable after stop
    assert!(monitor.channels().iter().all(|ch| ch.buffer().len() == 2));
}

#[test]
fn test_restart_resets_history() {
    let mut monitor = full_monitor();
    let (transport, _handle) = SharedTransport::new(MockTransport::new());
    monitor.connect(transport);

    monitor.start().unwrap();
    for _ in 0..3 {
        monitor.tick();
    }
    monitor.stop();

    monitor.start().unwrap();
    assert!(monitor.channels().iter().all(|ch| ch.buffer().is_empty()));
    monitor.tick();
    assert!(monitor.channels().iter().all(|ch| ch.buffer().len() == 1));
}

#[test]
fn test_deactivation_midstream_keeps_timeline() {
    let mut monitor = full_monitor();
    let (transport, mock) = SharedTransport::new(MockTransport::new().with_register(0x90, 7));
    monitor.connect(transport);
    monitor.start().unwrap();

    monitor.tick();
    monitor.set_channel_active("Vel Cmd [Rpm]", false);
    monitor.tick();
    monitor.tick();

    let ch = monitor.channel("Vel Cmd [Rpm]").unwrap();
    let samples = ch.buffer().snapshot();
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].value(), Some(7.0));
    assert!(samples[1].is_gap() && samples[2].is_gap());

    // The deactivated channel's register left the poll plan: the velocity
    // block now starts at 0x91 instead of 0x90.
    let reads = mock.borrow().reads().to_vec();
    let last_tick = &reads[reads.len() - 3..];
    assert_eq!(last_tick, &[(0x85, 5), (0x91, 2), (0xA0, 2)]);
}

#[test]
fn test_window_eviction_over_long_run() {
    let catalog = catalog_for(MotorModel::Ihsv57);
    let mut monitor = Monitor::from_catalog(catalog, &MonitorConfig::default());
    monitor.set_channel_active("Pos Error", true);

    let (transport, mock) = SharedTransport::new(MockTransport::new());
    monitor.connect(transport);
    monitor.start().unwrap();

    mock.borrow_mut().set_register(0x89, 1);
    monitor.tick();
    mock.borrow_mut().set_register(0x89, 2);
    for _ in 0..WINDOW {
        monitor.tick();
    }

    let ch = monitor.channel("Pos Error").unwrap();
    assert_eq!(ch.buffer().len(), WINDOW);
    // The very first sample (value 1) was evicted
    assert_eq!(ch.buffer().iter().next().unwrap().value(), Some(2.0));
    assert_eq!(ch.buffer().latest().unwrap().value(), Some(2.0));
}

#[test]
fn test_inactive_only_set_issues_no_io() {
    let catalog = catalog_for(MotorModel::Ihsv57);
    let mut monitor = Monitor::from_catalog(catalog, &MonitorConfig::default());
    let (transport, mock) = SharedTransport::new(MockTransport::new());
    monitor.connect(transport);
    monitor.start().unwrap();

    let report = monitor.tick();
    assert!(report.executed);
    assert_eq!(report.values, 0);
    assert!(mock.borrow().reads().is_empty());
    // Gap markers still advanced every timeline
    assert!(monitor.channels().iter().all(|ch| ch.buffer().len() == 1));
}
