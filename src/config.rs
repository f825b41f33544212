use anyhow::{anyhow, bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_device: String,
    pub mount_point: PathBuf,
    pub output_dir: String,
    pub decimal_separator: String,
    pub read_interval_seconds: u64,
    pub write_interval_minutes: u64,
    pub use_fixture_sensors: bool,
    pub fixture_sensor_ids: Vec<String>,
    pub w1_devices_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let storage_device =
            env_string("TEMPLOG_STORAGE_DEVICE", Some("/dev/sda1".to_string()))?;
        let mount_point = PathBuf::from(env_string(
            "TEMPLOG_MOUNT_POINT",
            Some("/mnt/usbstick".to_string()),
        )?);
        let output_dir = env_string("TEMPLOG_OUTPUT_DIR", Some("mittaus".to_string()))?;
        let decimal_separator =
            env_string("TEMPLOG_DECIMAL_SEPARATOR", Some(",".to_string()))?;

        let read_interval_seconds = env_u64("TEMPLOG_READ_INTERVAL_SECONDS", Some(5))?;
        if read_interval_seconds == 0 {
            bail!("TEMPLOG_READ_INTERVAL_SECONDS must be at least 1");
        }
        let write_interval_minutes = env_u64("TEMPLOG_WRITE_INTERVAL_MINUTES", Some(1))?;
        if write_interval_minutes == 0 {
            bail!("TEMPLOG_WRITE_INTERVAL_MINUTES must be at least 1");
        }

        let use_fixture_sensors = env_bool("TEMPLOG_USE_FIXTURE_SENSORS", false);
        let fixture_sensor_ids = env_list(
            "TEMPLOG_FIXTURE_SENSOR_IDS",
            &["28-000000000000".to_string()],
        );
        let w1_devices_dir = PathBuf::from(env_string(
            "TEMPLOG_W1_DEVICES_DIR",
            Some("/sys/bus/w1/devices".to_string()),
        )?);

        Ok(Self {
            storage_device,
            mount_point,
            output_dir,
            decimal_separator,
            read_interval_seconds,
            write_interval_minutes,
            use_fixture_sensors,
            fixture_sensor_ids,
            w1_devices_dir,
        })
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_secs(self.read_interval_seconds)
    }

    pub fn write_interval(&self) -> Duration {
        Duration::from_secs(self.write_interval_minutes * 60)
    }

    pub fn output_directory(&self) -> PathBuf {
        self.mount_point.join(&self.output_dir)
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("y")
        })
        .unwrap_or(default)
}

fn env_list(key: &str, default: &[String]) -> Vec<String> {
    match env::var(key) {
        Ok(value) => value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => default.to_vec(),
    }
}
