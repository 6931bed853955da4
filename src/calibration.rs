use crate::config::TiltConfig;
use crate::normalize::NormalizedTilt;
use crate::sensor::ScreenRotation;
use serde::{Deserialize, Serialize};

/// Why a calibration was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationReason {
    /// First sample after the tracker was created
    FirstActivation,
    /// Screen rotation type changed
    RotationChange,
    /// Game logic asked for it (new round, team handoff, post-countdown)
    Trigger,
    /// Orientation stream was resubscribed
    StreamRestart,
}

impl CalibrationReason {
    /// Reasons that invalidate the coordinate frame of the raw gamma baseline
    fn discards_frame(&self) -> bool {
        matches!(
            self,
            CalibrationReason::RotationChange | CalibrationReason::StreamRestart
        )
    }

    /// Only game-issued requests wait out the post-gesture cooldown
    fn honours_cooldown(&self) -> bool {
        matches!(self, CalibrationReason::Trigger)
    }
}

/// Outcome of a calibration step, reported back to the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationUpdate {
    Started(CalibrationReason),
    Deferred { until_ms: u64 },
    Finalized { baseline: f64, sample_count: usize },
    /// A deferred request came due outside landscape and was dropped
    Abandoned,
}

/// Rolling baseline estimator.
///
/// Owns the baseline and raw-gamma baseline; everything else reads them.
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    window_size: usize,
    grace_ms: u64,
    cooldown_ms: u64,

    baseline: Option<f64>,
    raw_gamma_baseline: Option<f64>,
    samples: Vec<f64>,
    raw_gamma_samples: Vec<f64>,
    calibrating: bool,

    grace_deadline: Option<u64>,
    deferred_until: Option<u64>,
}

impl CalibrationEngine {
    pub fn new(config: &TiltConfig) -> Self {
        CalibrationEngine {
            window_size: config.calibration_window_size,
            grace_ms: config.calibration_grace_ms,
            cooldown_ms: config.calibration_cooldown_ms,
            baseline: None,
            raw_gamma_baseline: None,
            samples: Vec::with_capacity(config.calibration_window_size),
            raw_gamma_samples: Vec::with_capacity(config.calibration_window_size),
            calibrating: false,
            grace_deadline: None,
            deferred_until: None,
        }
    }

    /// Ask for a recalibration. Game-issued requests that land inside the
    /// cooldown after the last gesture are deferred instead of started.
    pub fn request(
        &mut self,
        now_ms: u64,
        reason: CalibrationReason,
        last_gesture_ms: Option<u64>,
    ) -> CalibrationUpdate {
        if reason.honours_cooldown() {
            if let Some(last) = last_gesture_ms {
                let until_ms = last.saturating_add(self.cooldown_ms);
                if now_ms < until_ms {
                    self.deferred_until = Some(until_ms);
                    log::debug!("calibration deferred until {}ms (cooldown)", until_ms);
                    return CalibrationUpdate::Deferred { until_ms };
                }
            }
        }

        self.begin(reason);
        CalibrationUpdate::Started(reason)
    }

    fn begin(&mut self, reason: CalibrationReason) {
        log::debug!("calibration started: {:?}", reason);
        self.calibrating = true;
        self.baseline = None;
        self.samples.clear();
        self.raw_gamma_samples.clear();
        self.grace_deadline = None;
        self.deferred_until = None;
        if reason.discards_frame() {
            self.raw_gamma_baseline = None;
        }
    }

    /// Back to the pre-activation state. Buffers are kept allocated.
    pub fn reset(&mut self) {
        self.calibrating = false;
        self.baseline = None;
        self.raw_gamma_baseline = None;
        self.samples.clear();
        self.raw_gamma_samples.clear();
        self.grace_deadline = None;
        self.deferred_until = None;
    }

    /// Reference used to unwrap gamma: the finalized raw baseline, or while a
    /// fresh calibration is collecting, its first sample.
    pub fn raw_gamma_reference(&self) -> Option<f64> {
        self.raw_gamma_baseline
            .or_else(|| self.raw_gamma_samples.first().copied())
    }

    /// Feed one normalized sample. No-op unless calibrating.
    pub fn observe(&mut self, now_ms: u64, normalized: NormalizedTilt) -> Option<CalibrationUpdate> {
        if !self.calibrating {
            return None;
        }

        self.samples.push(normalized.tilt);
        self.raw_gamma_samples.push(normalized.raw_gamma);

        if self.grace_deadline.is_none() {
            self.grace_deadline = Some(now_ms.saturating_add(self.grace_ms));
        }

        if self.samples.len() >= self.window_size {
            return self.finalize();
        }
        None
    }

    /// Fire any deadlines that have come due.
    ///
    /// A deferred request is re-checked against the latest gesture when it
    /// comes due: a newer gesture pushes it out by another cooldown, and a
    /// gesture still held keeps it waiting until the device is back at center.
    pub fn poll(
        &mut self,
        now_ms: u64,
        rotation: ScreenRotation,
        last_gesture_ms: Option<u64>,
        gesture_held: bool,
    ) -> Vec<CalibrationUpdate> {
        let mut updates = Vec::new();

        if self.calibrating && self.grace_deadline.map_or(false, |d| now_ms >= d) {
            log::debug!(
                "calibration grace expired with {}/{} samples",
                self.samples.len(),
                self.window_size
            );
            updates.extend(self.finalize());
        }

        if let Some(until_ms) = self.deferred_until {
            let cooldown_end = last_gesture_ms.map(|last| last.saturating_add(self.cooldown_ms));
            match cooldown_end {
                Some(end) if end > until_ms && now_ms >= until_ms => {
                    self.deferred_until = Some(end);
                    log::debug!("calibration deferred until {}ms (newer gesture)", end);
                    updates.push(CalibrationUpdate::Deferred { until_ms: end });
                }
                _ if now_ms < until_ms || gesture_held => {}
                _ if rotation.is_landscape() => {
                    self.deferred_until = None;
                    self.begin(CalibrationReason::Trigger);
                    updates.push(CalibrationUpdate::Started(CalibrationReason::Trigger));
                }
                _ => {
                    self.deferred_until = None;
                    log::debug!("deferred calibration abandoned ({})", rotation.as_str());
                    updates.push(CalibrationUpdate::Abandoned);
                }
            }
        }

        updates
    }

    fn finalize(&mut self) -> Option<CalibrationUpdate> {
        let sample_count = self.samples.len();
        if sample_count == 0 {
            return None;
        }

        let baseline = mean(&self.samples);
        self.baseline = Some(baseline);
        self.raw_gamma_baseline = Some(mean(&self.raw_gamma_samples));

        self.samples.clear();
        self.raw_gamma_samples.clear();
        self.grace_deadline = None;
        self.calibrating = false;

        log::debug!(
            "calibration finalized: baseline {:.1}° from {} samples",
            baseline,
            sample_count
        );
        Some(CalibrationUpdate::Finalized {
            baseline,
            sample_count,
        })
    }

    /// Cancel a pending deferred request without starting it
    pub fn cancel_deferred(&mut self) {
        self.deferred_until = None;
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn raw_gamma_baseline(&self) -> Option<f64> {
        self.raw_gamma_baseline
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    pub fn deferred_until(&self) -> Option<u64> {
        self.deferred_until
    }

    pub fn grace_deadline(&self) -> Option<u64> {
        self.grace_deadline
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tilt(value: f64) -> NormalizedTilt {
        NormalizedTilt {
            tilt: value,
            raw_gamma: value,
        }
    }

    #[test]
    fn test_full_window_finalizes_to_mean() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        assert!(engine.is_calibrating());

        for i in 0..9 {
            assert!(engine.observe(i * 16, tilt(i as f64)).is_none());
        }
        let update = engine.observe(144, tilt(9.0)).unwrap();

        match update {
            CalibrationUpdate::Finalized {
                baseline,
                sample_count,
            } => {
                assert_relative_eq!(baseline, 4.5);
                assert_eq!(sample_count, 10);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!engine.is_calibrating());
        assert_eq!(engine.sample_count(), 0);
        assert_relative_eq!(engine.raw_gamma_baseline().unwrap(), 4.5);
    }

    #[test]
    fn test_grace_deadline_forces_partial_finalize() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(1_000, CalibrationReason::Trigger, None);

        engine.observe(1_100, tilt(4.0));
        engine.observe(1_300, tilt(8.0));
        assert_eq!(engine.grace_deadline(), Some(1_600));

        assert!(engine.poll(1_599, ScreenRotation::LandscapePrimary, None, false).is_empty());
        let updates = engine.poll(1_600, ScreenRotation::LandscapePrimary, None, false);
        assert_eq!(
            updates,
            vec![CalibrationUpdate::Finalized {
                baseline: 6.0,
                sample_count: 2
            }]
        );
        assert_eq!(engine.baseline(), Some(6.0));
    }

    #[test]
    fn test_no_grace_timer_without_samples() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        assert!(engine.poll(60_000, ScreenRotation::LandscapePrimary, None, false).is_empty());
        assert!(engine.is_calibrating());
        assert_eq!(engine.baseline(), None);
    }

    #[test]
    fn test_trigger_inside_cooldown_is_deferred() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        for i in 0..10 {
            engine.observe(i, tilt(0.0));
        }

        let update = engine.request(3_000, CalibrationReason::Trigger, Some(2_500));
        assert_eq!(update, CalibrationUpdate::Deferred { until_ms: 4_500 });
        assert!(!engine.is_calibrating());
        assert_eq!(engine.baseline(), Some(0.0));

        assert!(engine.poll(4_000, ScreenRotation::LandscapePrimary, Some(2_500), false).is_empty());
        let updates = engine.poll(4_500, ScreenRotation::LandscapePrimary, Some(2_500), false);
        assert_eq!(
            updates,
            vec![CalibrationUpdate::Started(CalibrationReason::Trigger)]
        );
        assert!(engine.is_calibrating());
    }

    #[test]
    fn test_newer_gesture_pushes_deferral_out() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        engine.observe(0, tilt(0.0));
        engine.poll(500, ScreenRotation::LandscapePrimary, None, false);

        engine.request(1_000, CalibrationReason::Trigger, Some(800));
        assert_eq!(engine.deferred_until(), Some(2_800));

        // Another gesture at 2_700, still held when the first deadline passes
        let updates = engine.poll(2_800, ScreenRotation::LandscapePrimary, Some(2_700), true);
        assert_eq!(updates, vec![CalibrationUpdate::Deferred { until_ms: 4_700 }]);
        assert!(!engine.is_calibrating());
        assert_eq!(engine.baseline(), Some(0.0));

        assert!(engine
            .poll(4_699, ScreenRotation::LandscapePrimary, Some(2_700), false)
            .is_empty());
        let updates = engine.poll(4_700, ScreenRotation::LandscapePrimary, Some(2_700), false);
        assert_eq!(
            updates,
            vec![CalibrationUpdate::Started(CalibrationReason::Trigger)]
        );
    }

    #[test]
    fn test_due_deferral_waits_for_held_gesture() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        engine.observe(0, tilt(0.0));
        engine.poll(500, ScreenRotation::LandscapePrimary, None, false);

        engine.request(1_000, CalibrationReason::Trigger, Some(800));
        assert!(engine
            .poll(3_500, ScreenRotation::LandscapePrimary, Some(800), true)
            .is_empty());
        assert!(!engine.is_calibrating());
        assert_eq!(engine.deferred_until(), Some(2_800));

        let updates = engine.poll(3_600, ScreenRotation::LandscapePrimary, Some(800), false);
        assert_eq!(
            updates,
            vec![CalibrationUpdate::Started(CalibrationReason::Trigger)]
        );
        assert_eq!(engine.deferred_until(), None);
    }

    #[test]
    fn test_deferred_calibration_abandoned_outside_landscape() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        engine.observe(0, tilt(3.0));
        engine.poll(500, ScreenRotation::LandscapePrimary, None, false);

        engine.request(1_000, CalibrationReason::Trigger, Some(500));
        let updates = engine.poll(2_500, ScreenRotation::Portrait, Some(500), false);
        assert_eq!(updates, vec![CalibrationUpdate::Abandoned]);
        assert!(!engine.is_calibrating());
        assert_eq!(engine.baseline(), Some(3.0));
        assert_eq!(engine.deferred_until(), None);
    }

    #[test]
    fn test_rotation_change_ignores_cooldown_and_drops_frame() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        engine.observe(0, tilt(80.0));
        engine.poll(500, ScreenRotation::LandscapePrimary, None, false);
        assert_eq!(engine.raw_gamma_baseline(), Some(80.0));

        let update = engine.request(600, CalibrationReason::RotationChange, Some(550));
        assert_eq!(
            update,
            CalibrationUpdate::Started(CalibrationReason::RotationChange)
        );
        assert_eq!(engine.raw_gamma_baseline(), None);
        assert_eq!(engine.baseline(), None);
    }

    #[test]
    fn test_trigger_keeps_unwrap_reference() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::FirstActivation, None);
        engine.observe(0, tilt(85.0));
        engine.poll(500, ScreenRotation::LandscapePrimary, None, false);

        engine.request(5_000, CalibrationReason::Trigger, None);
        assert!(engine.is_calibrating());
        assert_eq!(engine.raw_gamma_reference(), Some(85.0));
    }

    #[test]
    fn test_first_sample_is_reference_while_collecting() {
        let mut engine = CalibrationEngine::new(&TiltConfig::default());
        engine.request(0, CalibrationReason::RotationChange, None);
        assert_eq!(engine.raw_gamma_reference(), None);
        engine.observe(0, tilt(-75.0));
        assert_eq!(engine.raw_gamma_reference(), Some(-75.0));
    }
}
