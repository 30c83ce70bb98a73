//! Hub orchestration tests: multi-sensor passes, published map shape, and
//! concurrent sessions sharing the arbiter from worker threads.

use std::sync::{Arc, Mutex};
use std::thread;

use envmux::arbiter::ChannelArbiter;
use envmux::bus::SharedBus;
use envmux::config::{ArbiterConfig, SensorConfig, SystemConfig};
use envmux::hub::{run_cycle, SensorHub};
use envmux::mux::Multiplexer;
use envmux::sensor::session::SensorSession;
use envmux::Error;

use crate::mock_bus::{FakeBus, FakeSensor, GOLDEN_TEMPERATURE};

const MUX_ADDR: u8 = 0x70;

fn config_for(sensors: Vec<SensorConfig>) -> SystemConfig {
    let mut config = SystemConfig {
        sensors,
        ..SystemConfig::default()
    };
    config.arbiter.poll_interval_ms = 0;
    config.measure_poll.poll_interval_ms = 0;
    config
}

#[test]
fn update_all_covers_every_configured_sensor() {
    let fake = FakeBus::new(MUX_ADDR);
    fake.add_sensor(0, 0x76, FakeSensor::new());
    fake.add_sensor(3, 0x77, FakeSensor::new());
    let shared: SharedBus = Arc::new(Mutex::new(fake.clone()));

    let config = config_for(vec![
        SensorConfig::default(),
        SensorConfig {
            address: 0x77,
            channel: 3,
            ..SensorConfig::default()
        },
    ]);
    let mut hub = SensorHub::new(shared, &config).unwrap();

    let readings = hub.update_all();
    assert_eq!(readings.len(), 2);

    let first = &readings["sensor_0_0x76"];
    let second = &readings["sensor_3_0x77"];
    assert!(first.ok && second.ok);
    assert!((first.temperature.unwrap() - GOLDEN_TEMPERATURE).abs() < 1e-9);

    // Sequential pass: each sensor's channel was switched in once.
    assert_eq!(fake.mux_writes(), vec![0b0000_0001, 0b0000_1000]);
}

#[test]
fn one_faulted_sensor_does_not_abort_the_pass() {
    let fake = FakeBus::new(MUX_ADDR);
    fake.add_sensor(0, 0x76, FakeSensor::new());
    // Channel 5 has no device: every cycle for it faults.
    let shared: SharedBus = Arc::new(Mutex::new(fake.clone()));

    let config = config_for(vec![
        SensorConfig::default(),
        SensorConfig {
            channel: 5,
            ..SensorConfig::default()
        },
    ]);
    let mut hub = SensorHub::new(shared, &config).unwrap();

    let readings = hub.update_all();
    assert!(readings["sensor_0_0x76"].ok);
    assert!(!readings["sensor_5_0x76"].ok);
}

#[test]
fn invalid_channel_is_rejected_at_construction() {
    let fake = FakeBus::new(MUX_ADDR);
    let shared: SharedBus = Arc::new(Mutex::new(fake));
    let config = config_for(vec![SensorConfig {
        channel: 8,
        ..SensorConfig::default()
    }]);
    assert_eq!(
        SensorHub::new(shared, &config).unwrap_err(),
        Error::InvalidChannel(8)
    );
}

#[test]
fn snapshot_json_contains_sensor_ids_and_values() {
    let fake = FakeBus::new(MUX_ADDR);
    fake.add_sensor(0, 0x76, FakeSensor::new());
    let shared: SharedBus = Arc::new(Mutex::new(fake));

    let mut hub = SensorHub::new(shared, &config_for(vec![SensorConfig::default()])).unwrap();
    hub.update_all();

    let json = hub.snapshot_json().unwrap();
    assert!(json.contains("sensor_0_0x76"));
    assert!(json.contains("\"ok\": true"));
    assert!(json.contains("temperature"));
}

#[test]
fn concurrent_sessions_on_different_channels_both_complete() {
    let fake = FakeBus::new(MUX_ADDR);
    fake.add_sensor(1, 0x76, FakeSensor::new());
    fake.add_sensor(6, 0x76, FakeSensor::new());
    let shared: SharedBus = Arc::new(Mutex::new(fake.clone()));

    let mux = Multiplexer::new(MUX_ADDR);
    let arbiter = Arc::new(ChannelArbiter::new(ArbiterConfig {
        max_wait_polls: 1000,
        poll_interval_ms: 1,
    }));

    let mut handles = Vec::new();
    for channel in [1u8, 6] {
        let shared = Arc::clone(&shared);
        let arbiter = Arc::clone(&arbiter);
        handles.push(thread::spawn(move || {
            let mut session = SensorSession::new(
                SensorConfig {
                    channel,
                    ..SensorConfig::default()
                },
                envmux::config::MeasurePollConfig {
                    max_polls: 20,
                    poll_interval_ms: 0,
                },
            );
            for _ in 0..10 {
                run_cycle(&shared, &mux, &arbiter, &mut session).unwrap();
            }
            session.reading()
        }));
    }

    for handle in handles {
        let reading = handle.join().unwrap();
        assert!(reading.ok);
        assert!((reading.temperature.unwrap() - GOLDEN_TEMPERATURE).abs() < 1e-9);
    }

    // Every cycle completed against a correctly switched channel and the
    // lock fully drained: nobody was starved into a forced takeover.
    assert_eq!(arbiter.takeover_count(), 0);
    assert_eq!(arbiter.active_channel(), None);
}
