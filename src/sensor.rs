use crate::config::Config;
use crate::error::ReadError;
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;

/// DS18B20 devices enumerate on the 1-wire bus with this family prefix.
const DS18B20_FAMILY_PREFIX: &str = "28";

static TEMP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"t=(-?\d+)").expect("temperature pattern compiles"));

/// One temperature reading from one sensor. Selected once at startup as
/// either the hardware bus reader or the fixture substitute.
pub trait SensorSource: Send {
    fn read_temperature(&self, id: &str) -> Result<f64, ReadError>;
}

/// Reads DS18B20 status text through the kernel 1-wire driver.
pub struct W1Sensor {
    devices_dir: PathBuf,
}

impl W1Sensor {
    pub fn new(devices_dir: PathBuf) -> Self {
        Self { devices_dir }
    }
}

impl SensorSource for W1Sensor {
    fn read_temperature(&self, id: &str) -> Result<f64, ReadError> {
        let path = self.devices_dir.join(id).join("w1_slave");
        let raw = fs::read_to_string(&path).map_err(|source| ReadError::Unreadable {
            sensor: id.to_string(),
            source,
        })?;
        parse_status_text(id, &raw)
    }
}

/// Canned DS18B20 status text for environments without the physical bus.
/// Always reads as 24.375 degrees, whatever the sensor id.
pub struct FixtureSensor;

const FIXTURE_STATUS: &str =
    "86 01 4b 46 7f ff 0a 10 5e : crc=5e YES\n86 01 4b 46 7f ff 0a 10 5e t=24375";

impl SensorSource for FixtureSensor {
    fn read_temperature(&self, id: &str) -> Result<f64, ReadError> {
        parse_status_text(id, FIXTURE_STATUS)
    }
}

// Status text is two lines of driver output, e.g.:
//   86 01 4b 46 7f ff 0a 10 5e : crc=5e YES
//   86 01 4b 46 7f ff 0a 10 5e t=24375
// with the milli-degree reading after the literal `t=`.
fn parse_status_text(id: &str, raw: &str) -> Result<f64, ReadError> {
    let millis = TEMP_PATTERN
        .captures(raw)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .ok_or_else(|| ReadError::Malformed {
            sensor: id.to_string(),
            raw: raw.to_string(),
        })?;
    Ok(millis as f64 / 1000.0)
}

pub fn build_source(config: &Config) -> Box<dyn SensorSource> {
    if config.use_fixture_sensors {
        Box::new(FixtureSensor)
    } else {
        Box::new(W1Sensor::new(config.w1_devices_dir.clone()))
    }
}

/// Ordered list of sensor ids to sample. Hardware deployments scan the bus
/// directory for DS18B20 entries; fixture deployments take the configured
/// fixed list.
pub fn discover(config: &Config) -> Result<Vec<String>> {
    if config.use_fixture_sensors {
        if config.fixture_sensor_ids.is_empty() {
            bail!("TEMPLOG_FIXTURE_SENSOR_IDS is empty");
        }
        return Ok(config.fixture_sensor_ids.clone());
    }

    let mut ids = Vec::new();
    let entries = fs::read_dir(&config.w1_devices_dir)
        .with_context(|| format!("failed to read {}", config.w1_devices_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.starts_with(DS18B20_FAMILY_PREFIX) {
            ids.push(name.to_string());
        }
    }
    ids.sort();
    if ids.is_empty() {
        bail!(
            "no DS18B20 sensors found under {}",
            config.w1_devices_dir.display()
        );
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(devices_dir: PathBuf) -> Config {
        Config {
            storage_device: "/dev/sda1".to_string(),
            mount_point: PathBuf::from("/mnt/usbstick"),
            output_dir: "mittaus".to_string(),
            decimal_separator: ",".to_string(),
            read_interval_seconds: 5,
            write_interval_minutes: 1,
            use_fixture_sensors: false,
            fixture_sensor_ids: vec![],
            w1_devices_dir: devices_dir,
        }
    }

    #[test]
    fn fixture_sensor_reads_canned_value() {
        let value = FixtureSensor.read_temperature("28-anything").unwrap();
        assert_eq!(value, 24.375);
    }

    #[test]
    fn parses_negative_milli_degrees() {
        let raw = "aa 00 4b 46 7f ff 0c 10 12 : crc=12 YES\naa 00 4b 46 7f ff 0c 10 12 t=-1062";
        let value = parse_status_text("28-test", raw).unwrap();
        assert_eq!(value, -1.062);
    }

    #[test]
    fn malformed_status_text_carries_raw_text() {
        let raw = "86 01 4b 46 7f ff 0a 10 5e : crc=5e NO";
        let err = parse_status_text("28-test", raw).unwrap_err();
        match err {
            ReadError::Malformed { sensor, raw: kept } => {
                assert_eq!(sensor, "28-test");
                assert!(kept.contains("crc=5e NO"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn w1_sensor_reads_from_bus_directory() {
        let dir = TempDir::new().unwrap();
        let sensor_dir = dir.path().join("28-0316a2798a3c");
        fs::create_dir_all(&sensor_dir).unwrap();
        fs::write(sensor_dir.join("w1_slave"), FIXTURE_STATUS).unwrap();

        let source = W1Sensor::new(dir.path().to_path_buf());
        let value = source.read_temperature("28-0316a2798a3c").unwrap();
        assert_eq!(value, 24.375);
    }

    #[test]
    fn missing_device_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let source = W1Sensor::new(dir.path().to_path_buf());
        let err = source.read_temperature("28-gone").unwrap_err();
        assert!(matches!(err, ReadError::Unreadable { .. }));
    }

    #[test]
    fn discover_keeps_only_ds18b20_entries_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["28-b", "10-old-family", "28-a", "w1_bus_master1"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }

        let config = test_config(dir.path().to_path_buf());
        let ids = discover(&config).unwrap();
        assert_eq!(ids, vec!["28-a".to_string(), "28-b".to_string()]);
    }

    #[test]
    fn discover_fails_when_bus_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path().to_path_buf());
        assert!(discover(&config).is_err());
    }

    #[test]
    fn discover_uses_fixed_list_for_fixture_deployments() {
        let mut config = test_config(PathBuf::from("/nonexistent"));
        config.use_fixture_sensors = true;
        config.fixture_sensor_ids = vec!["28-one".to_string(), "28-two".to_string()];
        let ids = discover(&config).unwrap();
        assert_eq!(ids, vec!["28-one".to_string(), "28-two".to_string()]);
    }
}
