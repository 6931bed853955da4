use crate::error::{TiltError, TiltResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds and timings for the tilt engine.
///
/// Field names serialize in camelCase (`tiltThreshold`, `readyArmDelayMs`, ...)
/// and any field missing from a config file falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TiltConfig {
    /// Degrees past the baseline that register a gesture
    pub tilt_threshold: f64,
    /// Degrees from the baseline that count as back at center
    pub return_threshold: f64,
    pub calibration_cooldown_ms: u64,
    pub calibration_grace_ms: u64,
    pub calibration_window_size: usize,
    pub ready_baseline_window_size: usize,
    pub ready_settle_tolerance_deg: f64,
    pub ready_hold_threshold_deg: f64,
    pub ready_arm_delay_ms: u64,
    pub ready_hold_duration_ms: u64,
}

impl Default for TiltConfig {
    fn default() -> Self {
        TiltConfig {
            tilt_threshold: 25.0,
            return_threshold: 10.0,
            calibration_cooldown_ms: 2000,
            calibration_grace_ms: 500,
            calibration_window_size: 10,
            ready_baseline_window_size: 15,
            ready_settle_tolerance_deg: 10.0,
            ready_hold_threshold_deg: 35.0,
            ready_arm_delay_ms: 1200,
            ready_hold_duration_ms: 250,
        }
    }
}

impl TiltConfig {
    /// Check relationships between thresholds the state machines rely on
    pub fn validate(&self) -> TiltResult<()> {
        if !self.return_threshold.is_finite() || self.return_threshold <= 0.0 {
            return Err(TiltError::InvalidConfig(format!(
                "returnThreshold must be positive, got {}",
                self.return_threshold
            )));
        }
        if !self.tilt_threshold.is_finite() || self.tilt_threshold <= self.return_threshold {
            return Err(TiltError::InvalidConfig(format!(
                "tiltThreshold ({}) must exceed returnThreshold ({})",
                self.tilt_threshold, self.return_threshold
            )));
        }
        if self.calibration_window_size == 0 {
            return Err(TiltError::InvalidConfig(
                "calibrationWindowSize must be at least 1".to_string(),
            ));
        }
        if self.ready_baseline_window_size == 0 {
            return Err(TiltError::InvalidConfig(
                "readyBaselineWindowSize must be at least 1".to_string(),
            ));
        }
        if !self.ready_settle_tolerance_deg.is_finite()
            || !self.ready_hold_threshold_deg.is_finite()
            || self.ready_settle_tolerance_deg < 0.0
            || self.ready_hold_threshold_deg <= self.ready_settle_tolerance_deg
        {
            return Err(TiltError::InvalidConfig(format!(
                "readyHoldThresholdDeg ({}) must exceed readySettleToleranceDeg ({})",
                self.ready_hold_threshold_deg, self.ready_settle_tolerance_deg
            )));
        }
        Ok(())
    }

    /// Parse a JSON config document and validate it
    pub fn from_json_str(json: &str) -> TiltResult<Self> {
        let config: TiltConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> TiltResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
