use crate::error::{TiltError, TiltResult};
use crate::source::{OrientationSource, Subscription};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Game session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created; orientation permission not yet resolved
    Negotiating,
    /// Tilt input available
    TiltEnabled,
    /// No tilt input; the game uses on-screen buttons
    ManualFallback,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Unrequested,
    Granted,
    Denied,
}

/// Serializable snapshot of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    pub state: SessionState,
    pub permission: PermissionState,
}

/// Per-session context handed to the orientation source adapter.
///
/// Holds the permission outcome for exactly one game session; a new session
/// negotiates again.
#[derive(Debug, Clone)]
pub struct GameSession {
    session_id: String,
    start_time: String,
    state: SessionState,
    permission: PermissionState,
}

impl GameSession {
    pub fn new() -> Self {
        let now = Utc::now();
        GameSession {
            session_id: format!("session_{}", now.timestamp_millis()),
            start_time: now.to_rfc3339(),
            state: SessionState::Negotiating,
            permission: PermissionState::Unrequested,
        }
    }

    /// Ask the source for orientation access once. Denial is not an error:
    /// the session switches to manual buttons.
    pub async fn negotiate_permission<S: OrientationSource>(
        &mut self,
        source: &mut S,
    ) -> TiltResult<SessionState> {
        match self.state {
            SessionState::Ended => return Err(TiltError::SessionEnded),
            SessionState::TiltEnabled | SessionState::ManualFallback => return Ok(self.state),
            SessionState::Negotiating => {}
        }

        if source.request_permission().await {
            self.permission = PermissionState::Granted;
            self.state = SessionState::TiltEnabled;
            log::info!("{}: orientation permission granted", self.session_id);
        } else {
            self.permission = PermissionState::Denied;
            self.state = SessionState::ManualFallback;
            log::warn!(
                "{}: orientation permission denied, using manual buttons",
                self.session_id
            );
        }
        Ok(self.state)
    }

    /// Player opted out of tilt controls
    pub fn fall_back_to_manual(&mut self) -> TiltResult<()> {
        match self.state {
            SessionState::Ended => Err(TiltError::SessionEnded),
            _ => {
                self.state = SessionState::ManualFallback;
                Ok(())
            }
        }
    }

    /// Subscribe to the source; only valid once tilt input is enabled.
    pub fn subscribe<S: OrientationSource>(&self, source: &mut S) -> TiltResult<Subscription> {
        match self.state {
            SessionState::TiltEnabled => Ok(source.subscribe()),
            SessionState::Ended => Err(TiltError::SessionEnded),
            other => Err(TiltError::InvalidState(format!(
                "cannot subscribe while {:?}",
                other
            ))),
        }
    }

    pub fn end(&mut self) -> TiltResult<SessionMetadata> {
        if self.state == SessionState::Ended {
            return Err(TiltError::SessionEnded);
        }
        self.state = SessionState::Ended;
        log::info!("{}: session ended", self.session_id);
        Ok(self.metadata())
    }

    pub fn tilt_enabled(&self) -> bool {
        self.state == SessionState::TiltEnabled
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            session_id: self.session_id.clone(),
            start_time: self.start_time.clone(),
            state: self.state,
            permission: self.permission,
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}
