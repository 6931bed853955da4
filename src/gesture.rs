use crate::config::TiltConfig;
use serde::{Deserialize, Serialize};

/// Direction of a recognised in-round tilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    /// Forward lean, positive delta
    Correct,
    /// Backward lean, negative delta
    Pass,
}

impl Gesture {
    pub fn is_correct(&self) -> bool {
        matches!(self, Gesture::Correct)
    }
}

/// Classifier output for a single delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSignal {
    /// Threshold crossed; fires at the crossing, not on return
    Detected(Gesture),
    /// Device back near center after a detected gesture
    Returned(Gesture),
}

/// Observable classifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GesturePhase {
    /// No baseline yet
    Idle,
    Centered,
    Pending(Gesture),
    /// Must pass back through center before anything new is recognised
    MustReturn,
}

/// Threshold state machine for correct/pass gestures.
///
/// Works on deltas against the calibrated baseline; the caller decides when a
/// baseline exists. At most one gesture is pending at a time.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    tilt_threshold: f64,
    return_threshold: f64,
    pending: Option<Gesture>,
    must_return_to_center: bool,
    last_gesture_ms: Option<u64>,
}

impl GestureClassifier {
    pub fn new(config: &TiltConfig) -> Self {
        GestureClassifier {
            tilt_threshold: config.tilt_threshold,
            return_threshold: config.return_threshold,
            pending: None,
            must_return_to_center: false,
            last_gesture_ms: None,
        }
    }

    pub fn evaluate(&mut self, delta: f64, now_ms: u64) -> Option<GestureSignal> {
        let magnitude = delta.abs();
        let centered = magnitude <= self.return_threshold;

        if let Some(gesture) = self.pending {
            // Direction changes while held are ignored until center
            if centered {
                self.pending = None;
                return Some(GestureSignal::Returned(gesture));
            }
            return None;
        }

        if self.must_return_to_center {
            if centered {
                self.must_return_to_center = false;
            }
            return None;
        }

        if magnitude > self.tilt_threshold {
            let gesture = if delta > 0.0 {
                Gesture::Correct
            } else {
                Gesture::Pass
            };
            self.pending = Some(gesture);
            self.last_gesture_ms = Some(now_ms);
            return Some(GestureSignal::Detected(gesture));
        }

        None
    }

    /// The game advanced without a tilt; drop any pending gesture and require
    /// a pass through center before the next one.
    pub fn force_return_to_center(&mut self) {
        self.pending = None;
        self.must_return_to_center = true;
    }

    /// Discard in-flight state. The last gesture time survives so the
    /// calibration cooldown still applies.
    pub fn reset(&mut self) {
        self.pending = None;
        self.must_return_to_center = false;
    }

    pub fn phase(&self, has_baseline: bool) -> GesturePhase {
        if !has_baseline {
            return GesturePhase::Idle;
        }
        match self.pending {
            Some(gesture) => GesturePhase::Pending(gesture),
            None if self.must_return_to_center => GesturePhase::MustReturn,
            None => GesturePhase::Centered,
        }
    }

    pub fn pending(&self) -> Option<Gesture> {
        self.pending
    }

    pub fn must_return_to_center(&self) -> bool {
        self.must_return_to_center
    }

    pub fn last_gesture_ms(&self) -> Option<u64> {
        self.last_gesture_ms
    }
}
