use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a participant in the call-then-game sequence.
///
/// Variants are declared in the order a pairing walks through them, so the
/// derived `Ord` is the progress order. Each `Await*` / `AwaitPeer*` couple is a
/// barrier: the first marks "waiting for my own signal", the second "I have
/// signalled, waiting for my peer".
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    NotConnected,
    AwaitMediaConfirm,
    AwaitPeerMediaConfirm,
    AwaitRoundStart,
    AwaitPeerRoundStart,
    ReviewPrompt,
    FirstQuery,
    FirstResponse,
    SecondQuery,
    SecondResponse,
    PostSession,
}

impl Phase {
    /// The phase that directly follows this one, if any.
    pub fn next(self) -> Option<Phase> {
        use Phase::*;
        match self {
            NotConnected => Some(AwaitMediaConfirm),
            AwaitMediaConfirm => Some(AwaitPeerMediaConfirm),
            AwaitPeerMediaConfirm => Some(AwaitRoundStart),
            AwaitRoundStart => Some(AwaitPeerRoundStart),
            AwaitPeerRoundStart => Some(ReviewPrompt),
            ReviewPrompt => Some(FirstQuery),
            FirstQuery => Some(FirstResponse),
            FirstResponse => Some(SecondQuery),
            SecondQuery => Some(SecondResponse),
            SecondResponse => Some(PostSession),
            PostSession => None,
        }
    }

    /// For a barrier's waiting phase, the phase a participant moves to once it
    /// has signalled on its own.
    pub fn arrived(self) -> Option<Phase> {
        match self {
            Phase::AwaitMediaConfirm => Some(Phase::AwaitPeerMediaConfirm),
            Phase::AwaitRoundStart => Some(Phase::AwaitPeerRoundStart),
            _ => None,
        }
    }

    /// True once a pairing has been accepted and not yet torn down.
    pub fn is_engaged(self) -> bool {
        self != Phase::NotConnected
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
