use crate::model::{OutboundMessage, Phase, Role, RoundContent};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Sink for messages addressed to one participant. The transport owns the
/// receiving end.
pub type OutboundSender = UnboundedSender<OutboundMessage>;

/// One side's view of a pairing. The caller records who it is calling, the
/// callee records who is calling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    CallingTo(String),
    CallingFrom(String),
}

impl Pairing {
    pub fn peer_name(&self) -> &str {
        match self {
            Pairing::CallingTo(name) | Pairing::CallingFrom(name) => name,
        }
    }

    pub fn is_caller(&self) -> bool {
        matches!(self, Pairing::CallingTo(_))
    }

    /// True if `self` and `other` describe the same call seen from both ends.
    pub fn mirrors(&self, own_name: &str, other: &Pairing, other_name: &str) -> bool {
        self.is_caller() != other.is_caller()
            && self.peer_name() == other_name
            && other.peer_name() == own_name
    }
}

/// Per-round data shared by both members of a pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundData {
    pub content: Option<RoundContent>,
    pub first_decision: Option<String>,
    pub second_decision: Option<String>,
}

/// Mutable state of a connected participant.
#[derive(Debug, Default)]
pub struct Session {
    pairing: Option<Pairing>,
    phase: Phase,
    role: Role,
    round: RoundData,
    sdp_offer: Option<String>,
    /// Identifies the accepted pairing; scheduled advances carry it and bail
    /// out if it changed.
    pairing_id: Option<Uuid>,
    pending_timer: Option<AbortHandle>,
}

impl Session {
    pub fn pairing(&self) -> Option<&Pairing> {
        self.pairing.as_ref()
    }

    pub fn peer_name(&self) -> Option<&str> {
        self.pairing.as_ref().map(Pairing::peer_name)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn round(&self) -> &RoundData {
        &self.round
    }

    pub fn sdp_offer(&self) -> Option<&str> {
        self.sdp_offer.as_deref()
    }

    pub fn pairing_id(&self) -> Option<Uuid> {
        self.pairing_id
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer.is_some()
    }

    pub(crate) fn call(&mut self, callee: &str, sdp_offer: String) {
        self.pairing = Some(Pairing::CallingTo(callee.to_string()));
        self.sdp_offer = Some(sdp_offer);
    }

    pub(crate) fn ring(&mut self, caller: &str) {
        self.pairing = Some(Pairing::CallingFrom(caller.to_string()));
    }

    pub(crate) fn take_offer(&mut self) -> Option<String> {
        self.sdp_offer.take()
    }

    /// Enters the first phase of an accepted pairing.
    pub(crate) fn engage(&mut self, pairing_id: Uuid) {
        self.phase = Phase::AwaitMediaConfirm;
        self.role = Role::None;
        self.round = RoundData::default();
        self.pairing_id = Some(pairing_id);
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        debug_assert!(phase >= self.phase, "phase moved backwards");
        self.phase = phase;
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn round_mut(&mut self) -> &mut RoundData {
        &mut self.round
    }

    pub(crate) fn arm_timer(&mut self, handle: AbortHandle) {
        self.pending_timer = Some(handle);
    }

    pub(crate) fn cancel_timer(&mut self) {
        if let Some(handle) = self.pending_timer.take() {
            handle.abort();
        }
    }

    /// Forgets the pairing and everything tied to it.
    pub(crate) fn reset(&mut self) {
        self.pairing = None;
        self.phase = Phase::NotConnected;
        self.role = Role::None;
        self.round = RoundData::default();
        self.sdp_offer = None;
        self.pairing_id = None;
        self.pending_timer = None;
    }
}

/// Shared handle to a participant's session.
///
/// Name, connection and outbound channel never change after registration and
/// live outside the lock; everything else sits behind an async mutex.
#[derive(Clone)]
pub struct SessionHandle {
    name: Arc<str>,
    connection_id: ConnectionId,
    channel: OutboundSender,
    state: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(name: &str, connection_id: ConnectionId, channel: OutboundSender) -> Self {
        Self {
            name: Arc::from(name),
            connection_id,
            channel,
            state: Arc::new(Mutex::new(Session::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().await
    }

    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<Session> {
        self.state.clone().lock_owned().await
    }

    pub fn same_as(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Total order used whenever two sessions are locked together.
    pub(crate) fn lock_key(&self) -> (&str, ConnectionId) {
        (&self.name, self.connection_id)
    }

    pub fn send(&self, message: OutboundMessage) {
        debug!(user = %self.name, ?message, "Sending message");
        if let Err(e) = self.channel.send(message) {
            debug!(user = %self.name, error = %e, "Outbound channel closed");
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("name", &self.name)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(name: &str) -> (SessionHandle, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionHandle::new(name, Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn pairing_views_mirror_each_other() {
        let caller = Pairing::CallingTo("bob".to_string());
        let callee = Pairing::CallingFrom("alice".to_string());

        assert!(caller.mirrors("alice", &callee, "bob"));
        assert!(callee.mirrors("bob", &caller, "alice"));
        assert!(!caller.mirrors("alice", &caller, "bob"));
        assert!(!caller.mirrors("carol", &callee, "bob"));
    }

    #[tokio::test]
    async fn reset_clears_pairing_state() {
        let (alice, _rx) = handle("alice");
        {
            let mut session = alice.lock().await;
            session.call("bob", "offer".to_string());
            session.engage(Uuid::new_v4());
            session.set_role(Role::Describer);
            session.round_mut().first_decision = Some("hat".to_string());
        }

        let mut session = alice.lock().await;
        assert_eq!(session.phase(), Phase::AwaitMediaConfirm);
        assert_eq!(session.peer_name(), Some("bob"));

        session.reset();
        assert_eq!(session.phase(), Phase::NotConnected);
        assert_eq!(session.pairing(), None);
        assert_eq!(session.role(), Role::None);
        assert_eq!(session.round(), &RoundData::default());
        assert_eq!(session.sdp_offer(), None);
        assert_eq!(session.pairing_id(), None);
    }

    #[tokio::test]
    async fn send_reaches_channel() {
        let (alice, mut rx) = handle("alice");
        alice.send(OutboundMessage::PeerStopped);
        assert_eq!(rx.recv().await, Some(OutboundMessage::PeerStopped));
    }

    #[tokio::test]
    async fn send_to_closed_channel_is_harmless() {
        let (alice, rx) = handle("alice");
        drop(rx);
        alice.send(OutboundMessage::PeerStopped);
    }

    #[test]
    fn clones_share_state() {
        let (alice, _rx) = handle("alice");
        let (other, _rx2) = handle("alice");
        assert!(alice.same_as(&alice.clone()));
        assert!(!alice.same_as(&other));
    }
}
