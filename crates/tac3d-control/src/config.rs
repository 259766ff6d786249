//! [`ControllerConfig`] – runtime parameters of the motion cycle.
//!
//! Every endpoint name the controller touches is a field here with a
//! default matching the simulation setup, so nothing about the deployment is
//! baked into the control logic.

use std::time::Duration;

use tac3d_types::ControlError;

use crate::trajectory::{CircularTrajectory, DEFAULT_ANGULAR_RATE, DEFAULT_RADIUS};

/// Motion service the controller drives by default.
pub const DEFAULT_SERVICE_NAME: &str = "/sim_ros2_interface/franka_control2d";
/// Sensor topic whose arrivals trigger the cycle.
pub const DEFAULT_SENSOR_TOPIC: &str = "/sensors/tactile_image";
/// Message type announced when subscribing to the sensor topic.
pub const DEFAULT_SENSOR_TYPE: &str = "sensor_msgs/msg/Image";
/// Subscription queue depth requested from the remote side.
pub const DEFAULT_QUEUE_LENGTH: usize = 10;
/// Interval between service-readiness probes during startup.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration bundle for [`MotionCycleController`][crate::MotionCycleController].
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Service that receives displacement commands.
    pub service_name: String,
    /// Topic whose samples trigger one cycle each.
    pub sensor_topic: String,
    /// Message type of `sensor_topic`.
    pub sensor_type: String,
    /// Queue depth hint for the sensor subscription.
    pub queue_length: usize,
    /// Delay between readiness probes while waiting for the service.
    pub poll_interval: Duration,
    /// Displacement profile.
    pub trajectory: CircularTrajectory,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            sensor_topic: DEFAULT_SENSOR_TOPIC.to_string(),
            sensor_type: DEFAULT_SENSOR_TYPE.to_string(),
            queue_length: DEFAULT_QUEUE_LENGTH,
            poll_interval: DEFAULT_POLL_INTERVAL,
            trajectory: CircularTrajectory::new(DEFAULT_RADIUS, DEFAULT_ANGULAR_RATE),
        }
    }
}

impl ControllerConfig {
    /// Reject configurations the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.service_name.trim().is_empty() {
            return Err(ControlError::Config("service_name must not be empty".into()));
        }
        if self.sensor_topic.trim().is_empty() {
            return Err(ControlError::Config("sensor_topic must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ControlError::Config("poll_interval must be greater than zero".into()));
        }
        let radius = self.trajectory.radius;
        if !radius.is_finite() || radius < 0.0 {
            return Err(ControlError::Config(format!(
                "radius must be finite and non-negative, got {radius}"
            )));
        }
        if !self.trajectory.angular_rate.is_finite() {
            return Err(ControlError::Config(format!(
                "angular_rate must be finite, got {}",
                self.trajectory.angular_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulation_endpoints() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.service_name, "/sim_ros2_interface/franka_control2d");
        assert_eq!(cfg.sensor_topic, "/sensors/tactile_image");
        assert_eq!(cfg.sensor_type, "sensor_msgs/msg/Image");
        assert_eq!(cfg.queue_length, 10);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert!((cfg.trajectory.radius - 2e-3).abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let cfg = ControllerConfig {
            poll_interval: Duration::ZERO,
            ..ControllerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ControlError::Config(_))));
    }

    #[test]
    fn rejects_bad_radius() {
        for radius in [-1.0, f64::NAN, f64::INFINITY] {
            let cfg = ControllerConfig {
                trajectory: CircularTrajectory::new(radius, 1.0),
                ..ControllerConfig::default()
            };
            assert!(cfg.validate().is_err(), "radius {radius} accepted");
        }
    }

    #[test]
    fn rejects_non_finite_rate() {
        let cfg = ControllerConfig {
            trajectory: CircularTrajectory::new(1e-3, f64::NAN),
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_blank_endpoints() {
        let cfg = ControllerConfig {
            service_name: "  ".into(),
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ControllerConfig {
            sensor_topic: String::new(),
            ..ControllerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
