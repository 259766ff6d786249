//! [`CircularTrajectory`] – the open-loop displacement generator.
//!
//! The displacement at elapsed time `t` is
//!
//! ```text
//! dx = cos(ω·t) · r
//! dy = sin(ω·t) · r
//! ```
//!
//! so every command lies on a circle of radius `r`, traced once per
//! `2π / ω` seconds. Sensor content plays no part in it.

use std::f64::consts::TAU;
use std::time::Duration;

use tac3d_types::DisplacementCommand;

/// Radius of the default circle, in the motion service's distance units.
pub const DEFAULT_RADIUS: f64 = 2e-3;

/// Default angular rate in rad/s (one revolution every 2π seconds).
pub const DEFAULT_ANGULAR_RATE: f64 = 1.0;

/// A fixed circular displacement profile parameterised by elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularTrajectory {
    pub radius: f64,
    /// rad/s
    pub angular_rate: f64,
}

impl CircularTrajectory {
    pub fn new(radius: f64, angular_rate: f64) -> Self {
        Self {
            radius,
            angular_rate,
        }
    }

    /// Displacement for a point `elapsed` after the epoch.
    pub fn displacement_at(&self, elapsed: Duration) -> DisplacementCommand {
        let phase = elapsed.as_secs_f64() * self.angular_rate;
        DisplacementCommand::new(phase.cos() * self.radius, phase.sin() * self.radius)
    }

    /// Time for one full revolution. `None` for a stationary profile or one
    /// too slow for its period to fit in a [`Duration`].
    pub fn period(&self) -> Option<Duration> {
        if self.angular_rate == 0.0 || !self.angular_rate.is_finite() {
            return None;
        }
        Duration::try_from_secs_f64(TAU / self.angular_rate.abs()).ok()
    }
}

impl Default for CircularTrajectory {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS, DEFAULT_ANGULAR_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOL: f64 = 1e-12;

    #[test]
    fn starts_on_positive_x_axis() {
        let cmd = CircularTrajectory::default().displacement_at(Duration::ZERO);
        assert!((cmd.dx - 2e-3).abs() < TOL);
        assert!(cmd.dy.abs() < TOL);
    }

    #[test]
    fn quarter_turn_at_half_pi_seconds() {
        let cmd = CircularTrajectory::default().displacement_at(Duration::from_secs_f64(FRAC_PI_2));
        assert!(cmd.dx.abs() < 1e-9, "dx = {}", cmd.dx);
        assert!((cmd.dy - 2e-3).abs() < 1e-9, "dy = {}", cmd.dy);
    }

    #[test]
    fn half_turn_at_pi_seconds() {
        let cmd = CircularTrajectory::default().displacement_at(Duration::from_secs_f64(PI));
        assert!((cmd.dx + 2e-3).abs() < 1e-9);
        assert!(cmd.dy.abs() < 1e-9);
    }

    #[test]
    fn every_command_lies_on_the_circle() {
        let traj = CircularTrajectory::default();
        let r2 = 2e-3_f64 * 2e-3;
        for ms in (0..20_000).step_by(37) {
            let cmd = traj.displacement_at(Duration::from_millis(ms));
            let d2 = cmd.dx * cmd.dx + cmd.dy * cmd.dy;
            assert!((d2 - r2).abs() < 1e-15, "off circle at {ms} ms: {d2}");
        }
    }

    #[test]
    fn repeats_after_one_period() {
        let traj = CircularTrajectory::default();
        let period = traj.period().unwrap();
        assert!((period.as_secs_f64() - TAU).abs() < 1e-9);

        let t = Duration::from_millis(1234);
        let a = traj.displacement_at(t);
        let b = traj.displacement_at(t + period);
        assert!((a.dx - b.dx).abs() < 1e-9);
        assert!((a.dy - b.dy).abs() < 1e-9);
    }

    #[test]
    fn custom_radius_and_rate() {
        let traj = CircularTrajectory::new(0.5, 2.0);
        let cmd = traj.displacement_at(Duration::from_secs_f64(FRAC_PI_2 / 2.0));
        assert!(cmd.dx.abs() < 1e-9);
        assert!((cmd.dy - 0.5).abs() < 1e-9);
        assert!((traj.period().unwrap().as_secs_f64() - PI).abs() < 1e-9);
    }

    #[test]
    fn stationary_profile_has_no_period() {
        assert!(CircularTrajectory::new(1.0, 0.0).period().is_none());
    }

    #[test]
    fn near_stationary_profile_has_no_period() {
        assert!(CircularTrajectory::new(1.0, 1e-300).period().is_none());
        assert!(CircularTrajectory::new(1.0, -1e-300).period().is_none());
        // Slow but representable.
        let slow = CircularTrajectory::new(1.0, 1e-6).period().unwrap();
        assert!((slow.as_secs_f64() - TAU * 1e6).abs() < 1e-3);
    }
}
