use super::{MediaError, MediaSessionGateway, MediaSessionHandle, MediaSide};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionKind {
    Paired { caller: String, callee: String },
    Playback { user: String },
}

#[derive(Debug, Clone)]
struct LoopbackSession {
    kind: SessionKind,
    negotiated: HashSet<MediaSide>,
    recording: bool,
    playing: bool,
}

/// In-process gateway that answers offers without a media server.
///
/// Used by the development server and by tests. Answers are synthesized from
/// the offer, recordings are tracked by user name so playback can be
/// exercised end to end.
#[derive(Clone, Default)]
pub struct LoopbackGateway {
    sessions: Arc<RwLock<HashMap<MediaSessionHandle, LoopbackSession>>>,
    recordings: Arc<RwLock<HashSet<String>>>,
}

impl LoopbackGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created and not yet released.
    pub fn live_sessions(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn is_live(&self, handle: MediaSessionHandle) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(&handle))
            .unwrap_or(false)
    }

    pub fn is_recording(&self, handle: MediaSessionHandle) -> bool {
        self.sessions
            .read()
            .map(|s| s.get(&handle).is_some_and(|session| session.recording))
            .unwrap_or(false)
    }

    pub fn has_recording(&self, user: &str) -> bool {
        self.recordings
            .read()
            .map(|r| r.contains(user))
            .unwrap_or(false)
    }

    fn insert(&self, kind: SessionKind) -> Result<MediaSessionHandle, MediaError> {
        let handle = MediaSessionHandle::new();
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.insert(
                    handle,
                    LoopbackSession {
                        kind,
                        negotiated: HashSet::new(),
                        recording: false,
                        playing: false,
                    },
                );
                Ok(handle)
            }
            Err(e) => {
                error!(?e, "Failed to create media session");
                Err(MediaError::Unavailable(e.to_string()))
            }
        }
    }

    fn with_session<T>(
        &self,
        handle: MediaSessionHandle,
        f: impl FnOnce(&mut LoopbackSession) -> Result<T, MediaError>,
    ) -> Result<T, MediaError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| MediaError::Unavailable(e.to_string()))?;
        let session = sessions
            .get_mut(&handle)
            .ok_or(MediaError::UnknownHandle(handle))?;
        f(session)
    }
}

fn synthesize_answer(handle: MediaSessionHandle, side: MediaSide, offer_sdp: &str) -> String {
    let media_lines: Vec<&str> = offer_sdp
        .lines()
        .filter(|line| line.starts_with("m="))
        .collect();

    let mut answer = format!("v=0\r\no=loopback {handle} 0 IN IP4 127.0.0.1\r\ns={side}\r\nt=0 0\r\n");
    for line in media_lines {
        answer.push_str(line.trim_end());
        answer.push_str("\r\na=recvonly\r\n");
    }
    answer
}

#[async_trait]
impl MediaSessionGateway for LoopbackGateway {
    #[instrument(skip(self))]
    async fn create_paired_session(
        &self,
        caller: &str,
        callee: &str,
    ) -> Result<MediaSessionHandle, MediaError> {
        let handle = self.insert(SessionKind::Paired {
            caller: caller.to_string(),
            callee: callee.to_string(),
        })?;
        info!(%handle, "Paired media session created");
        Ok(handle)
    }

    #[instrument(skip(self))]
    async fn create_playback_session(
        &self,
        recorded_user: &str,
    ) -> Result<MediaSessionHandle, MediaError> {
        if !self.has_recording(recorded_user) {
            return Err(MediaError::NoRecording(recorded_user.to_string()));
        }
        let handle = self.insert(SessionKind::Playback {
            user: recorded_user.to_string(),
        })?;
        info!(%handle, "Playback media session created");
        Ok(handle)
    }

    #[instrument(skip(self, offer_sdp))]
    async fn negotiate(
        &self,
        handle: MediaSessionHandle,
        side: MediaSide,
        offer_sdp: &str,
    ) -> Result<String, MediaError> {
        if offer_sdp.trim().is_empty() {
            return Err(MediaError::NegotiationFailed("empty offer".to_string()));
        }

        self.with_session(handle, |session| {
            let side_fits = matches!(
                (&session.kind, side),
                (SessionKind::Paired { .. }, MediaSide::Caller | MediaSide::Callee)
                    | (SessionKind::Playback { .. }, MediaSide::Viewer)
            );
            if !side_fits {
                return Err(MediaError::NegotiationFailed(format!(
                    "{side} is not an endpoint of this session"
                )));
            }
            session.negotiated.insert(side);
            Ok(())
        })?;

        debug!(%handle, %side, "Offer processed");
        Ok(synthesize_answer(handle, side, offer_sdp))
    }

    #[instrument(skip(self))]
    async fn start_recording(&self, handle: MediaSessionHandle) -> Result<(), MediaError> {
        let users = self.with_session(handle, |session| match &session.kind {
            SessionKind::Paired { caller, callee } => {
                session.recording = true;
                Ok(vec![caller.clone(), callee.clone()])
            }
            SessionKind::Playback { .. } => Err(MediaError::NegotiationFailed(
                "playback sessions cannot record".to_string(),
            )),
        })?;

        let mut recordings = self
            .recordings
            .write()
            .map_err(|e| MediaError::Unavailable(e.to_string()))?;
        recordings.extend(users);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn start_playback(&self, handle: MediaSessionHandle) -> Result<(), MediaError> {
        self.with_session(handle, |session| {
            session.playing = true;
            Ok(())
        })
    }

    #[instrument(skip(self))]
    async fn release(&self, handle: MediaSessionHandle) -> Result<(), MediaError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| MediaError::Unavailable(e.to_string()))?;
        match sessions.remove(&handle) {
            Some(_) => {
                info!(%handle, "Media session released");
                Ok(())
            }
            None => Err(MediaError::UnknownHandle(handle)),
        }
    }
}
