//! Configuration file – reads `~/.tac3d/motion_controller.toml`.
//!
//! Every key is optional; a missing file means "all defaults".

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tac3d_control::config::{
    DEFAULT_QUEUE_LENGTH, DEFAULT_SENSOR_TOPIC, DEFAULT_SENSOR_TYPE, DEFAULT_SERVICE_NAME,
};
use tac3d_control::trajectory::{DEFAULT_ANGULAR_RATE, DEFAULT_RADIUS};
use tac3d_control::{CircularTrajectory, ControllerConfig};

/// Persisted settings of the motion controller process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the rosbridge server.
    #[serde(default = "default_rosbridge_url")]
    pub rosbridge_url: String,

    /// Motion-control service receiving `{dx, dy}` requests.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Sensor topic whose samples trigger the cycle.
    #[serde(default = "default_sensor_topic")]
    pub sensor_topic: String,

    #[serde(default = "default_sensor_type")]
    pub sensor_type: String,

    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Milliseconds between service-readiness probes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Milliseconds a service call may stay unanswered.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Circle radius in the motion service's distance units.
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Angular rate in rad/s.
    #[serde(default = "default_angular_rate")]
    pub angular_rate: f64,

    /// Runtime worker threads. Unset means one per core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

fn default_rosbridge_url() -> String {
    "ws://localhost:9090".to_string()
}
fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
fn default_sensor_topic() -> String {
    DEFAULT_SENSOR_TOPIC.to_string()
}
fn default_sensor_type() -> String {
    DEFAULT_SENSOR_TYPE.to_string()
}
fn default_queue_length() -> usize {
    DEFAULT_QUEUE_LENGTH
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_call_timeout_ms() -> u64 {
    5000
}
fn default_radius() -> f64 {
    DEFAULT_RADIUS
}
fn default_angular_rate() -> f64 {
    DEFAULT_ANGULAR_RATE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rosbridge_url: default_rosbridge_url(),
            service_name: default_service_name(),
            sensor_topic: default_sensor_topic(),
            sensor_type: default_sensor_type(),
            queue_length: default_queue_length(),
            poll_interval_ms: default_poll_interval_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            radius: default_radius(),
            angular_rate: default_angular_rate(),
            workers: None,
        }
    }
}

impl Config {
    /// The controller's share of the settings.
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            service_name: self.service_name.clone(),
            sensor_topic: self.sensor_topic.clone(),
            sensor_type: self.sensor_type.clone(),
            queue_length: self.queue_length,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            trajectory: CircularTrajectory::new(self.radius, self.angular_rate),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Check the settings the controller does not validate itself.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_ms == 0 {
            return Err("call_timeout_ms must be greater than zero".to_string());
        }
        if self.workers == Some(0) {
            return Err("workers must be at least 1".to_string());
        }
        if !self.rosbridge_url.starts_with("ws://") && !self.rosbridge_url.starts_with("wss://") {
            return Err(format!(
                "rosbridge_url must be a ws:// or wss:// URL, got {}",
                self.rosbridge_url
            ));
        }
        self.controller().validate().map_err(|e| e.to_string())
    }
}

/// Return the config path: `$TAC3D_CONFIG` if set, else
/// `~/.tac3d/motion_controller.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("TAC3D_CONFIG") {
        return PathBuf::from(explicit);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".tac3d").join("motion_controller.toml")
}

/// Load the effective configuration: file (or defaults) plus `TAC3D_*`
/// environment overrides.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load the config from a specific path. Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `TAC3D_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TAC3D_ROSBRIDGE_URL` | `rosbridge_url` |
/// | `TAC3D_SERVICE` | `service_name` |
/// | `TAC3D_SENSOR_TOPIC` | `sensor_topic` |
/// | `TAC3D_WORKERS` | `workers` |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Override logic with an injectable lookup, so tests need not touch the
/// process environment.
pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TAC3D_ROSBRIDGE_URL") {
        cfg.rosbridge_url = v;
    }
    if let Some(v) = lookup("TAC3D_SERVICE") {
        cfg.service_name = v;
    }
    if let Some(v) = lookup("TAC3D_SENSOR_TOPIC") {
        cfg.sensor_topic = v;
    }
    if let Some(v) = lookup("TAC3D_WORKERS")
        && let Ok(n) = v.trim().parse::<usize>()
    {
        cfg.workers = Some(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_simulation_setup() {
        let cfg = Config::default();
        assert_eq!(cfg.rosbridge_url, "ws://localhost:9090");
        assert_eq!(cfg.service_name, "/sim_ros2_interface/franka_control2d");
        assert_eq!(cfg.sensor_topic, "/sensors/tactile_image");
        assert_eq!(cfg.poll_interval_ms, 1000);
        assert!(cfg.workers.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn controller_config_carries_every_setting() {
        let cfg = Config {
            poll_interval_ms: 250,
            radius: 0.01,
            angular_rate: 2.0,
            ..Config::default()
        };
        let ctrl = cfg.controller();
        assert_eq!(ctrl.poll_interval, Duration::from_millis(250));
        assert_eq!(ctrl.trajectory, CircularTrajectory::new(0.01, 2.0));
        assert_eq!(ctrl.service_name, cfg.service_name);
        assert_eq!(ctrl.queue_length, 10);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("motion_controller.toml");
        std::fs::write(
            &path,
            "service_name = \"/robot/control2d\"\nradius = 0.005\nworkers = 2\n",
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.service_name, "/robot/control2d");
        assert!((cfg.radius - 0.005).abs() < f64::EPSILON);
        assert_eq!(cfg.workers, Some(2));
        assert_eq!(cfg.sensor_topic, "/sensors/tactile_image");
        assert_eq!(cfg.call_timeout_ms, 5000);
    }

    #[test]
    fn serialised_defaults_load_back() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("motion_controller.toml");
        std::fs::write(&path, toml::to_string_pretty(&Config::default()).unwrap()).unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("motion_controller.toml");
        std::fs::write(&path, "radius = \"wide\"").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"), "{err}");
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_tac3d_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".tac3d"));
        assert!(p.to_string_lossy().ends_with("motion_controller.toml"));
    }

    #[test]
    fn overrides_replace_endpoints() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup_from(&[
                ("TAC3D_ROSBRIDGE_URL", "ws://robot:9090"),
                ("TAC3D_SERVICE", "/robot/control2d"),
                ("TAC3D_SENSOR_TOPIC", "/robot/tactile"),
                ("TAC3D_WORKERS", "3"),
            ]),
        );
        assert_eq!(cfg.rosbridge_url, "ws://robot:9090");
        assert_eq!(cfg.service_name, "/robot/control2d");
        assert_eq!(cfg.sensor_topic, "/robot/tactile");
        assert_eq!(cfg.workers, Some(3));
    }

    #[test]
    fn overrides_ignore_invalid_worker_count() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, lookup_from(&[("TAC3D_WORKERS", "many")]));
        assert!(cfg.workers.is_none());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            Config { call_timeout_ms: 0, ..Config::default() },
            Config { workers: Some(0), ..Config::default() },
            Config { rosbridge_url: "http://localhost:9090".into(), ..Config::default() },
            Config { poll_interval_ms: 0, ..Config::default() },
            Config { radius: -1.0, ..Config::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "accepted {cfg:?}");
        }
    }
}
