use crate::calibration::{CalibrationEngine, CalibrationReason, CalibrationUpdate};
use crate::clock::Clock;
use crate::config::TiltConfig;
use crate::error::TiltResult;
use crate::gesture::{GestureClassifier, GesturePhase, GestureSignal};
use crate::normalize::normalize;
use crate::ready::{ReadyDetector, ReadyPhase};
use crate::sensor::{OrientationSample, ScreenRotation};
use serde::{Deserialize, Serialize};

/// Discrete gameplay events produced by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TiltEvent {
    Correct,
    Pass,
    /// Device back near level after a gesture; the round advances on this
    Return { was_correct: bool },
    Ready,
}

impl From<GestureSignal> for TiltEvent {
    fn from(signal: GestureSignal) -> Self {
        match signal {
            GestureSignal::Detected(g) if g.is_correct() => TiltEvent::Correct,
            GestureSignal::Detected(_) => TiltEvent::Pass,
            GestureSignal::Returned(g) => TiltEvent::Return {
                was_correct: g.is_correct(),
            },
        }
    }
}

impl TiltEvent {
    /// Route this event to the matching listener callback
    pub fn dispatch<L: TiltListener + ?Sized>(self, listener: &mut L) {
        match self {
            TiltEvent::Correct => listener.on_tilt_correct(),
            TiltEvent::Pass => listener.on_tilt_pass(),
            TiltEvent::Return { was_correct } => listener.on_tilt_return(was_correct),
            TiltEvent::Ready => listener.on_ready(),
        }
    }
}

/// Callback-style consumer of tilt events (round timer, scoring, ...)
pub trait TiltListener {
    fn on_tilt_correct(&mut self) {}
    fn on_tilt_pass(&mut self) {}
    fn on_tilt_return(&mut self, _was_correct: bool) {}
    fn on_ready(&mut self) {}
}

/// Orientation stream in, gameplay events out.
///
/// Composes the normalizer, calibration engine, gesture classifier and the
/// optional ready detector. Every timer is a deadline checked against `C`, so
/// nothing fires after the tracker (or the ready phase) is dropped.
pub struct TiltTracker<C: Clock> {
    config: TiltConfig,
    clock: C,
    calibration: CalibrationEngine,
    classifier: GestureClassifier,
    ready: Option<ReadyDetector>,
    rotation: Option<ScreenRotation>,
    activated: bool,
    gestures_enabled: bool,
    calibration_trigger: u64,
}

impl<C: Clock> TiltTracker<C> {
    pub fn new(config: TiltConfig, clock: C) -> TiltResult<Self> {
        config.validate()?;
        Ok(TiltTracker {
            calibration: CalibrationEngine::new(&config),
            classifier: GestureClassifier::new(&config),
            config,
            clock,
            ready: None,
            rotation: None,
            activated: false,
            gestures_enabled: true,
            calibration_trigger: 0,
        })
    }

    /// Process one sample in arrival order.
    pub fn ingest(&mut self, sample: OrientationSample, rotation: ScreenRotation) -> Vec<TiltEvent> {
        let now_ms = self.clock.now_ms();
        let mut events = Vec::new();

        match self.rotation {
            Some(previous) if previous != rotation => {
                log::info!(
                    "rotation changed {} -> {}, recalibrating",
                    previous.as_str(),
                    rotation.as_str()
                );
                self.rotation = Some(rotation);
                self.calibration.cancel_deferred();
                let update = self
                    .calibration
                    .request(now_ms, CalibrationReason::RotationChange, None);
                self.apply_calibration_update(update);
            }
            Some(_) => {}
            None => self.rotation = Some(rotation),
        }

        if !self.activated {
            self.activated = true;
            let update = self
                .calibration
                .request(now_ms, CalibrationReason::FirstActivation, None);
            self.apply_calibration_update(update);
        }

        // Timers that came due before this sample fire first
        self.fire_deadlines(now_ms, &mut events);

        let normalized = normalize(&sample, rotation, self.calibration.raw_gamma_reference());

        if let Some(ready) = self.ready.as_mut() {
            if ready.observe(now_ms, normalized.tilt, rotation) {
                self.finish_ready(&mut events);
            }
        }

        if self.calibration.is_calibrating() {
            if let Some(update) = self.calibration.observe(now_ms, normalized) {
                self.apply_calibration_update(update);
            }
            return events;
        }

        if self.ready.is_some() || !self.gestures_enabled {
            return events;
        }

        let Some(baseline) = self.calibration.baseline() else {
            return events;
        };

        if let Some(signal) = self.classifier.evaluate(normalized.tilt - baseline, now_ms) {
            let event = TiltEvent::from(signal);
            log::debug!("{:?} at {:.1}° from baseline", event, normalized.tilt - baseline);
            events.push(event);
        }

        events
    }

    /// Fire deadlines when no sample has arrived (grace, cooldown, ready hold).
    pub fn tick(&mut self) -> Vec<TiltEvent> {
        let now_ms = self.clock.now_ms();
        let mut events = Vec::new();
        self.fire_deadlines(now_ms, &mut events);
        events
    }

    fn fire_deadlines(&mut self, now_ms: u64, events: &mut Vec<TiltEvent>) {
        let rotation = self.rotation.unwrap_or_default();
        let updates = self.calibration.poll(
            now_ms,
            rotation,
            self.classifier.last_gesture_ms(),
            self.classifier.pending().is_some(),
        );
        for update in updates {
            self.apply_calibration_update(update);
        }

        if let Some(ready) = self.ready.as_mut() {
            if ready.poll(now_ms) {
                self.finish_ready(events);
            }
        }
    }

    fn finish_ready(&mut self, events: &mut Vec<TiltEvent>) {
        log::info!("ready gesture detected");
        self.ready = None;
        // The ready tilt itself must not score
        self.classifier.force_return_to_center();
        events.push(TiltEvent::Ready);
    }

    fn apply_calibration_update(&mut self, update: CalibrationUpdate) {
        match update {
            CalibrationUpdate::Started(_) => self.classifier.reset(),
            CalibrationUpdate::Finalized {
                baseline,
                sample_count,
            } => {
                log::info!(
                    "baseline {:.1}° ({} samples, {})",
                    baseline,
                    sample_count,
                    self.rotation.unwrap_or_default().as_str()
                );
            }
            CalibrationUpdate::Deferred { .. } | CalibrationUpdate::Abandoned => {}
        }
    }

    /// Recalibrate on behalf of the game (new round, team handoff,
    /// post-countdown). Deferred if a gesture fired within the cooldown.
    pub fn recalibrate(&mut self) -> CalibrationUpdate {
        let now_ms = self.clock.now_ms();
        self.activated = true;
        let update = self.calibration.request(
            now_ms,
            CalibrationReason::Trigger,
            self.classifier.last_gesture_ms(),
        );
        self.apply_calibration_update(update.clone());
        update
    }

    /// Mirror an externally held trigger counter; recalibrates when it moves.
    pub fn sync_calibration_trigger(&mut self, counter: u64) -> Option<CalibrationUpdate> {
        if counter == self.calibration_trigger {
            return None;
        }
        self.calibration_trigger = counter;
        Some(self.recalibrate())
    }

    /// The word was advanced manually; a stale tilt must not double-fire.
    pub fn force_return_to_center(&mut self) {
        self.classifier.force_return_to_center();
    }

    /// Pause / countdown gate. Re-enabling requires a pass through center.
    pub fn set_gestures_enabled(&mut self, enabled: bool) {
        if enabled == self.gestures_enabled {
            return;
        }
        self.gestures_enabled = enabled;
        if enabled {
            self.classifier.force_return_to_center();
        } else {
            self.classifier.reset();
        }
    }

    /// Start waiting for the ready tilt. A gesture left over from the
    /// previous turn is dropped and must pass through center first.
    pub fn begin_ready_phase(&mut self) {
        self.classifier.force_return_to_center();
        self.ready = Some(ReadyDetector::new(&self.config));
    }

    pub fn end_ready_phase(&mut self) {
        self.ready = None;
    }

    /// The orientation stream was resubscribed: start again from scratch.
    pub fn restart_stream(&mut self) {
        self.calibration.reset();
        self.classifier.reset();
        self.rotation = None;
        self.activated = false;
        if self.ready.is_some() {
            self.ready = Some(ReadyDetector::new(&self.config));
        }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.calibration.baseline()
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration.is_calibrating()
    }

    /// When a cooldown-deferred recalibration is due, if one is waiting
    pub fn deferred_calibration_ms(&self) -> Option<u64> {
        self.calibration.deferred_until()
    }

    pub fn phase(&self) -> GesturePhase {
        let has_baseline = !self.calibration.is_calibrating() && self.calibration.baseline().is_some();
        self.classifier.phase(has_baseline)
    }

    pub fn ready_phase(&self) -> Option<ReadyPhase> {
        self.ready.as_ref().map(ReadyDetector::phase)
    }

    pub fn rotation(&self) -> Option<ScreenRotation> {
        self.rotation
    }

    pub fn gestures_enabled(&self) -> bool {
        self.gestures_enabled
    }

    pub fn config(&self) -> &TiltConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
