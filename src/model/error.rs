use crate::media::MediaError;
use crate::model::Phase;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("empty user name")]
    EmptyName,

    #[error("user '{0}' already registered")]
    NameAlreadyRegistered(String),

    #[error("connection already registered")]
    ConnectionAlreadyRegistered,

    #[error("connection is not registered")]
    NotRegistered,

    #[error("user '{0}' is not registered")]
    PeerNotFound(String),

    #[error("cannot pair with yourself")]
    CannotPairWithSelf,

    #[error("user '{0}' is busy")]
    PeerBusy(String),

    #[error("already in a session")]
    AlreadyPaired,

    #[error("no active pairing")]
    PairingNotEstablished,

    #[error("missing sdp offer")]
    MissingOffer,

    #[error("phase mismatch: expected {expected}, own {own}, peer {peer:?}")]
    PhaseMismatch {
        expected: Phase,
        own: Phase,
        peer: Option<Phase>,
    },

    #[error("timer fired after the pairing moved on")]
    StaleTimer,

    #[error("media error: {0}")]
    Media(#[from] MediaError),
}

impl SessionError {
    /// Internal synchronization races; logged, never sent to a participant.
    pub fn is_sync_race(&self) -> bool {
        matches!(
            self,
            SessionError::PhaseMismatch { .. } | SessionError::StaleTimer
        )
    }
}
