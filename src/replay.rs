use crate::clock::ManualClock;
use crate::config::TiltConfig;
use crate::error::TiltResult;
use crate::sensor::OrientationReading;
use crate::trace::{GameCommand, TimedCommand};
use crate::tracker::{TiltEvent, TiltListener, TiltTracker};
use serde::Serialize;
use std::collections::VecDeque;

/// Frame interval used to fire deadlines between recorded samples
pub const DEFAULT_TICK_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedEvent {
    pub t_ms: u64,
    #[serde(flatten)]
    pub event: TiltEvent,
}

/// Totals over one replay
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub readings: usize,
    pub commands: usize,
    pub correct: u32,
    pub passed: u32,
    pub returns: u32,
    pub ready: u32,
    pub final_baseline: Option<f64>,
}

impl TiltListener for ReplaySummary {
    fn on_tilt_correct(&mut self) {
        self.correct += 1;
    }

    fn on_tilt_pass(&mut self) {
        self.passed += 1;
    }

    fn on_tilt_return(&mut self, _was_correct: bool) {
        self.returns += 1;
    }

    fn on_ready(&mut self) {
        self.ready += 1;
    }
}

/// Plays recorded readings and game commands through a tracker on a manual
/// clock, ticking between samples so deadlines fire on time.
pub struct Replay {
    tracker: TiltTracker<ManualClock>,
    clock: ManualClock,
    commands: VecDeque<TimedCommand>,
    tick_ms: u64,
    now_ms: u64,
    summary: ReplaySummary,
}

impl Replay {
    pub fn new(config: TiltConfig, commands: Vec<TimedCommand>) -> TiltResult<Self> {
        let clock = ManualClock::new();
        let tracker = TiltTracker::new(config, clock.clone())?;
        Ok(Replay {
            tracker,
            clock,
            commands: commands.into(),
            tick_ms: DEFAULT_TICK_MS,
            now_ms: 0,
            summary: ReplaySummary::default(),
        })
    }

    /// Tick interval between samples; 0 disables intermediate ticks
    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn tracker_mut(&mut self) -> &mut TiltTracker<ManualClock> {
        &mut self.tracker
    }

    /// Feed one reading; returns the events it (and anything due before it) produced.
    pub fn push(&mut self, reading: OrientationReading) -> Vec<TimedEvent> {
        let mut events = self.advance_to(reading.t_ms);
        self.clock.set(self.now_ms);
        let emitted = self.tracker.ingest(reading.sample, reading.rotation);
        self.summary.readings += 1;
        self.record(emitted, &mut events);
        events
    }

    /// Apply remaining commands and run the clock out to `until_ms`.
    pub fn finish(mut self, until_ms: u64) -> (Vec<TimedEvent>, ReplaySummary) {
        let until_ms = until_ms.max(self.commands.back().map(|c| c.t_ms).unwrap_or(0));
        let events = self.advance_to(until_ms);
        self.summary.final_baseline = self.tracker.baseline();
        (events, self.summary)
    }

    fn advance_to(&mut self, t_ms: u64) -> Vec<TimedEvent> {
        let mut events = Vec::new();
        while let Some(command) = self.commands.front().copied() {
            if command.t_ms > t_ms {
                break;
            }
            self.commands.pop_front();
            self.tick_until(command.t_ms, &mut events);
            self.apply(command.command);
            self.summary.commands += 1;
        }
        self.tick_until(t_ms, &mut events);
        events
    }

    /// Tick on the frame grid strictly before `t_ms`, then move the clock there
    fn tick_until(&mut self, t_ms: u64, events: &mut Vec<TimedEvent>) {
        if t_ms <= self.now_ms {
            return;
        }
        if self.tick_ms > 0 {
            let mut next = self.now_ms + self.tick_ms;
            while next < t_ms {
                self.now_ms = next;
                self.clock.set(next);
                let emitted = self.tracker.tick();
                self.record(emitted, events);
                next += self.tick_ms;
            }
        }
        self.now_ms = t_ms;
        self.clock.set(t_ms);
        let emitted = self.tracker.tick();
        self.record(emitted, events);
    }

    fn apply(&mut self, command: GameCommand) {
        log::debug!("{}ms: {:?}", self.now_ms, command);
        match command {
            GameCommand::Recalibrate => {
                self.tracker.recalibrate();
            }
            GameCommand::ForceReturn => self.tracker.force_return_to_center(),
            GameCommand::Pause => self.tracker.set_gestures_enabled(false),
            GameCommand::Resume => self.tracker.set_gestures_enabled(true),
            GameCommand::BeginReady => self.tracker.begin_ready_phase(),
            GameCommand::EndReady => self.tracker.end_ready_phase(),
            GameCommand::RestartStream => self.tracker.restart_stream(),
        }
    }

    fn record(&mut self, emitted: Vec<TiltEvent>, events: &mut Vec<TimedEvent>) {
        for event in emitted {
            event.dispatch(&mut self.summary);
            events.push(TimedEvent {
                t_ms: self.now_ms,
                event,
            });
        }
    }
}
