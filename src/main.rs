//! envmux — acquisition loop entry point (Raspberry Pi / Linux).
//!
//! Loads the JSON configuration, opens the Pi's I2C bus, and runs the
//! update loop: every interval each configured sensor is updated under the
//! channel arbiter and the published map is logged and dumped as a JSON
//! snapshot for downstream consumers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use envmux::bus::{LinuxBus, SharedBus};
use envmux::config::SystemConfig;
use envmux::hub::SensorHub;

const DEFAULT_CONFIG_PATH: &str = "/etc/envmux/config.json";
const SNAPSHOT_PATH: &str = "/run/envmux/sensor_data.json";

fn load_config(path: &PathBuf) -> Result<SystemConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = load_config(&path)?;
    anyhow::ensure!(!config.sensors.is_empty(), "no sensors configured");

    info!(
        "envmux v{}: {} sensor(s), multiplexer {:#04x}",
        env!("CARGO_PKG_VERSION"),
        config.sensors.len(),
        config.multiplexer_address
    );

    let linux_bus = match config.i2c_bus {
        Some(n) => LinuxBus::with_bus(n),
        None => LinuxBus::new(),
    }
    .context("opening I2C bus")?;
    let bus: SharedBus = Arc::new(Mutex::new(linux_bus));
    let mut hub = SensorHub::new(bus, &config)?;
    let interval = Duration::from_secs(u64::from(config.update_interval_secs));

    loop {
        let readings = hub.update_all();
        for (id, reading) in &readings {
            if reading.ok {
                info!(
                    "{id}: T={:?} °C  P={:?} hPa  H={:?} %",
                    reading.temperature, reading.pressure, reading.humidity
                );
            } else {
                warn!("{id}: not ok (stale values retained)");
            }
        }

        let takeovers = hub.arbiter().takeover_count();
        if takeovers > 0 {
            warn!("arbiter: {takeovers} forced channel takeover(s) since start");
        }

        match hub.snapshot_json() {
            Ok(json) => {
                if let Err(e) = std::fs::write(SNAPSHOT_PATH, json) {
                    warn!("snapshot write failed: {e}");
                }
            }
            Err(e) => warn!("snapshot serialisation failed: {e}"),
        }

        thread::sleep(interval);
    }
}
