use crate::config::TiltConfig;
use crate::sensor::ScreenRotation;
use serde::{Deserialize, Serialize};

/// Where the ready detector is in its settle → arm → hold sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyPhase {
    CollectingBaseline,
    AwaitingSettle,
    /// Settled; waiting out the arm delay
    Armed,
    AwaitingHold,
    Holding,
    Triggered,
}

/// Detects the single deliberate, held tilt that starts a turn.
///
/// Scoped to one waiting-for-ready phase: create it when the phase begins and
/// drop it when the phase ends. Landscape only.
#[derive(Debug, Clone)]
pub struct ReadyDetector {
    window_size: usize,
    settle_tolerance: f64,
    hold_threshold: f64,
    arm_delay_ms: u64,
    hold_duration_ms: u64,

    rotation: Option<ScreenRotation>,
    baseline: Option<f64>,
    samples: Vec<f64>,
    settled: bool,
    arm_deadline: Option<u64>,
    armed: bool,
    hold_start: Option<u64>,
    triggered: bool,
}

impl ReadyDetector {
    pub fn new(config: &TiltConfig) -> Self {
        ReadyDetector {
            window_size: config.ready_baseline_window_size,
            settle_tolerance: config.ready_settle_tolerance_deg,
            hold_threshold: config.ready_hold_threshold_deg,
            arm_delay_ms: config.ready_arm_delay_ms,
            hold_duration_ms: config.ready_hold_duration_ms,
            rotation: None,
            baseline: None,
            samples: Vec::with_capacity(config.ready_baseline_window_size),
            settled: false,
            arm_deadline: None,
            armed: false,
            hold_start: None,
            triggered: false,
        }
    }

    /// Start over from baseline collection. Cancels the arm and hold timers.
    fn restart(&mut self) {
        self.baseline = None;
        self.samples.clear();
        self.settled = false;
        self.arm_deadline = None;
        self.armed = false;
        self.hold_start = None;
    }

    /// Feed one effective-tilt sample. Returns true exactly once, on the
    /// sample that completes the hold.
    pub fn observe(&mut self, now_ms: u64, tilt: f64, rotation: ScreenRotation) -> bool {
        if self.triggered {
            return false;
        }

        if self.rotation != Some(rotation) {
            if self.rotation.is_some() {
                log::debug!("ready detection restarted on rotation {}", rotation.as_str());
            }
            self.restart();
            self.rotation = Some(rotation);
        }
        if !rotation.is_landscape() {
            return false;
        }

        self.fire_arm_deadline(now_ms);

        let baseline = match self.baseline {
            Some(b) => b,
            None => {
                self.samples.push(tilt);
                if self.samples.len() >= self.window_size {
                    let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
                    self.baseline = Some(mean);
                    self.samples.clear();
                }
                return false;
            }
        };

        let delta = (tilt - baseline).abs();

        if !self.settled {
            if delta <= self.settle_tolerance {
                self.settled = true;
                self.arm_deadline = Some(now_ms.saturating_add(self.arm_delay_ms));
            }
            return false;
        }

        if !self.armed {
            return false;
        }

        if delta >= self.hold_threshold {
            let start = *self.hold_start.get_or_insert(now_ms);
            return self.complete_hold(now_ms, start);
        }

        self.hold_start = None;
        false
    }

    /// Fire timers without a new sample. Returns true if the hold completed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.triggered {
            return false;
        }
        self.fire_arm_deadline(now_ms);
        match self.hold_start {
            Some(start) => self.complete_hold(now_ms, start),
            None => false,
        }
    }

    fn fire_arm_deadline(&mut self, now_ms: u64) {
        if let Some(deadline) = self.arm_deadline {
            if now_ms >= deadline {
                self.arm_deadline = None;
                self.armed = true;
            }
        }
    }

    fn complete_hold(&mut self, now_ms: u64, start: u64) -> bool {
        if now_ms.saturating_sub(start) >= self.hold_duration_ms {
            self.triggered = true;
            self.hold_start = None;
            return true;
        }
        false
    }

    pub fn phase(&self) -> ReadyPhase {
        if self.triggered {
            ReadyPhase::Triggered
        } else if self.baseline.is_none() {
            ReadyPhase::CollectingBaseline
        } else if !self.settled {
            ReadyPhase::AwaitingSettle
        } else if !self.armed {
            ReadyPhase::Armed
        } else if self.hold_start.is_some() {
            ReadyPhase::Holding
        } else {
            ReadyPhase::AwaitingHold
        }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}
