// Tilt gesture engine
// Turns a device orientation stream into correct / pass / ready gameplay events

pub mod calibration;
pub mod clock;
pub mod config;
pub mod error;
pub mod gesture;
pub mod normalize;
pub mod ready;
pub mod replay;
pub mod sensor;
pub mod session;
pub mod source;
pub mod trace;
pub mod tracker;

pub use calibration::{CalibrationEngine, CalibrationReason, CalibrationUpdate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TiltConfig;
pub use error::{TiltError, TiltResult};
pub use gesture::{Gesture, GestureClassifier, GesturePhase};
pub use normalize::{effective_tilt, normalize, NormalizedTilt};
pub use ready::{ReadyDetector, ReadyPhase};
pub use sensor::{OrientationReading, OrientationSample, ScreenRotation};
pub use session::{GameSession, PermissionState, SessionState};
pub use source::{OrientationSource, Subscription};
pub use tracker::{TiltEvent, TiltListener, TiltTracker};
