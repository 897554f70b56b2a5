use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("unknown media session {0}")]
    UnknownHandle(MediaSessionHandle),

    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("no recording for user '{0}'")]
    NoRecording(String),

    #[error("media server unavailable: {0}")]
    Unavailable(String),
}

/// Opaque reference to a media session held by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaSessionHandle(Uuid);

impl MediaSessionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaSessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaSessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Endpoint of a media session an offer is negotiated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSide {
    Caller,
    Callee,
    /// Receiver of a recorded playback
    Viewer,
}

impl fmt::Display for MediaSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSide::Caller => write!(f, "caller"),
            MediaSide::Callee => write!(f, "callee"),
            MediaSide::Viewer => write!(f, "viewer"),
        }
    }
}

/// Media server operations consumed by the session core.
#[async_trait]
pub trait MediaSessionGateway: Send + Sync {
    /// Creates a two-way session between caller and callee, with one recorder
    /// per side.
    async fn create_paired_session(
        &self,
        caller: &str,
        callee: &str,
    ) -> Result<MediaSessionHandle, MediaError>;

    /// Creates a one-way session replaying what `recorded_user` recorded.
    async fn create_playback_session(
        &self,
        recorded_user: &str,
    ) -> Result<MediaSessionHandle, MediaError>;

    /// Processes an SDP offer for one side and returns the SDP answer.
    async fn negotiate(
        &self,
        handle: MediaSessionHandle,
        side: MediaSide,
        offer_sdp: &str,
    ) -> Result<String, MediaError>;

    async fn start_recording(&self, handle: MediaSessionHandle) -> Result<(), MediaError>;

    async fn start_playback(&self, handle: MediaSessionHandle) -> Result<(), MediaError>;

    async fn release(&self, handle: MediaSessionHandle) -> Result<(), MediaError>;
}
