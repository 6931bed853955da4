use crate::error::{TiltError, TiltResult};
use crate::sensor::{OrientationReading, ScreenRotation};
use crate::source::{OrientationSource, Subscription, SUBSCRIPTION_CAPACITY};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Game-side actions recorded alongside the sensor stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GameCommand {
    /// New round, team handoff or post-countdown
    Recalibrate,
    /// Word advanced with an on-screen button
    ForceReturn,
    Pause,
    Resume,
    BeginReady,
    EndReady,
    RestartStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedCommand {
    pub t_ms: u64,
    #[serde(flatten)]
    pub command: GameCommand,
}

/// Recorded orientation session.
///
/// ```json
/// {
///   "permission_granted": true,
///   "readings": [{"t_ms": 0, "rotation": "landscape-primary", "beta": 1.0, "gamma": 85.0}],
///   "commands": [{"t_ms": 4000, "command": "recalibrate"}]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default = "default_permission")]
    pub permission_granted: bool,
    pub readings: Vec<OrientationReading>,
    #[serde(default)]
    pub commands: Vec<TimedCommand>,
}

fn default_permission() -> bool {
    true
}

impl Trace {
    /// Load a `.json` or `.json.gz` trace
    pub fn load(path: &Path) -> TiltResult<Trace> {
        let file = File::open(path)?;
        let trace: Trace = if path.extension().map(|e| e == "gz").unwrap_or(false) {
            let gz = GzDecoder::new(file);
            serde_json::from_reader(BufReader::new(gz))?
        } else {
            serde_json::from_reader(BufReader::new(file))?
        };
        trace.validate()?;
        Ok(trace)
    }

    pub fn from_json_str(json: &str) -> TiltResult<Trace> {
        let trace: Trace = serde_json::from_str(json)?;
        trace.validate()?;
        Ok(trace)
    }

    /// Readings and commands must each be in time order
    pub fn validate(&self) -> TiltResult<()> {
        if let Some(i) = self
            .readings
            .windows(2)
            .position(|w| w[1].t_ms < w[0].t_ms)
        {
            return Err(TiltError::Trace(format!(
                "reading {} at {}ms precedes the one before it",
                i + 1,
                self.readings[i + 1].t_ms
            )));
        }
        if let Some(i) = self
            .commands
            .windows(2)
            .position(|w| w[1].t_ms < w[0].t_ms)
        {
            return Err(TiltError::Trace(format!(
                "command {} at {}ms is out of order",
                i + 1,
                self.commands[i + 1].t_ms
            )));
        }
        Ok(())
    }

    pub fn duration_ms(&self) -> u64 {
        let last_reading = self.readings.last().map(|r| r.t_ms).unwrap_or(0);
        let last_command = self.commands.last().map(|c| c.t_ms).unwrap_or(0);
        last_reading.max(last_command)
    }
}

/// Orientation source that plays back a recorded trace.
pub struct TraceSource {
    readings: Arc<Vec<OrientationReading>>,
    permission_granted: bool,
    realtime: bool,
    rotation: Arc<Mutex<ScreenRotation>>,
}

impl TraceSource {
    /// `realtime` paces delivery by the recorded timestamps; otherwise
    /// readings are pushed as fast as the subscriber drains them.
    pub fn new(trace: &Trace, realtime: bool) -> Self {
        let initial = trace
            .readings
            .first()
            .map(|r| r.rotation)
            .unwrap_or_default();
        TraceSource {
            readings: Arc::new(trace.readings.clone()),
            permission_granted: trace.permission_granted,
            realtime,
            rotation: Arc::new(Mutex::new(initial)),
        }
    }
}

impl OrientationSource for TraceSource {
    /// Spawns the delivery task; must be called inside a tokio runtime.
    fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let readings = Arc::clone(&self.readings);
        let rotation = Arc::clone(&self.rotation);
        let realtime = self.realtime;

        let task = tokio::spawn(async move {
            let mut previous_t: Option<u64> = None;
            let mut sent = 0usize;
            for reading in readings.iter() {
                if realtime {
                    if let Some(prev) = previous_t {
                        sleep(Duration::from_millis(reading.t_ms.saturating_sub(prev))).await;
                    }
                }
                previous_t = Some(reading.t_ms);

                if let Ok(mut current) = rotation.lock() {
                    *current = reading.rotation;
                }
                if tx.send(*reading).await.is_err() {
                    log::debug!("trace subscriber gone after {} readings", sent);
                    return;
                }
                sent += 1;
            }
            log::debug!("trace delivery finished: {} readings", sent);
        });

        Subscription::with_task(rx, task)
    }

    fn screen_rotation(&self) -> ScreenRotation {
        self.rotation.lock().map(|r| *r).unwrap_or_default()
    }

    async fn request_permission(&mut self) -> bool {
        self.permission_granted
    }
}
