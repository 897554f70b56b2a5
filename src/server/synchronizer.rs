use super::ParticipantDirectory;
use crate::config::PhaseDurations;
use crate::model::{
    ContentCatalog, OutboundMessage, Phase, Role, Session, SessionError, SessionHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

/// Both sessions of a pair, locked in key order.
///
/// `own` is the session the operation started from; `peer` is the other one.
/// Dropping the value releases both locks.
pub struct LockedPair {
    own: SessionHandle,
    peer: SessionHandle,
    own_state: OwnedMutexGuard<Session>,
    peer_state: OwnedMutexGuard<Session>,
}

impl LockedPair {
    pub fn own(&self) -> &SessionHandle {
        &self.own
    }

    pub fn peer(&self) -> &SessionHandle {
        &self.peer
    }

    pub fn own_state(&self) -> &Session {
        &self.own_state
    }

    pub fn peer_state(&self) -> &Session {
        &self.peer_state
    }

    /// True if each side's pairing names the other.
    pub fn is_mutually_paired(&self) -> bool {
        match (self.own_state.pairing(), self.peer_state.pairing()) {
            (Some(own), Some(peer)) => own.mirrors(self.own.name(), peer, self.peer.name()),
            _ => false,
        }
    }

    /// True for a proposal from `own` to `peer` that has not been accepted yet.
    fn is_open_proposal(&self) -> bool {
        self.is_mutually_paired()
            && self.own_state.pairing().is_some_and(|p| p.is_caller())
            && !self.own_state.phase().is_engaged()
            && !self.peer_state.phase().is_engaged()
    }

    /// True if both sides still belong to the pairing identified by `pairing_id`.
    fn is_current(&self, pairing_id: Uuid) -> bool {
        self.is_mutually_paired()
            && self.own_state.pairing_id() == Some(pairing_id)
            && self.peer_state.pairing_id() == Some(pairing_id)
    }

    fn pairing_id(&self) -> Option<Uuid> {
        self.own_state
            .pairing_id()
            .filter(|id| self.peer_state.pairing_id() == Some(*id))
    }

    pub fn both_in(&self, phase: Phase) -> bool {
        self.own_state.phase() == phase && self.peer_state.phase() == phase
    }

    fn mismatch(&self, expected: Phase) -> SessionError {
        SessionError::PhaseMismatch {
            expected,
            own: self.own_state.phase(),
            peer: Some(self.peer_state.phase()),
        }
    }

    fn advance_both(&mut self, phase: Phase) {
        self.own_state.set_phase(phase);
        self.peer_state.set_phase(phase);
        debug!(own = %self.own.name(), peer = %self.peer.name(), %phase, "Pair advanced");
    }

    fn each_state(&mut self, mut f: impl FnMut(&mut Session)) {
        f(&mut self.own_state);
        f(&mut self.peer_state);
    }

    /// The session holding `role`, if either does.
    pub fn role_holder(&self, role: Role) -> Option<&SessionHandle> {
        if self.own_state.role() == role {
            Some(&self.own)
        } else if self.peer_state.role() == role {
            Some(&self.peer)
        } else {
            None
        }
    }

    fn send_both(&self, message: OutboundMessage) {
        self.own.send(message.clone());
        self.peer.send(message);
    }

    fn send_to_role(&self, role: Role, message: OutboundMessage) {
        match self.role_holder(role) {
            Some(session) => session.send(message),
            None => warn!(%role, "No session holds role"),
        }
    }
}

/// Advances paired sessions through their phases.
///
/// Barrier transitions fire only when both sides have signalled; timed
/// transitions run in a spawned task per window that re-locks the pair and
/// re-validates it before acting.
#[derive(Clone)]
pub struct PairSynchronizer {
    directory: Arc<dyn ParticipantDirectory>,
    catalog: Arc<dyn ContentCatalog>,
    durations: PhaseDurations,
}

impl PairSynchronizer {
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        catalog: Arc<dyn ContentCatalog>,
        durations: PhaseDurations,
    ) -> Self {
        Self {
            directory,
            catalog,
            durations,
        }
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    /// Locks both sessions, always taking the larger `(name, connection)` key
    /// first so two tasks locking the same pair can never wait on each other.
    pub async fn lock_pair(
        &self,
        own: &SessionHandle,
        peer: &SessionHandle,
    ) -> Result<LockedPair, SessionError> {
        if own.same_as(peer) {
            return Err(SessionError::CannotPairWithSelf);
        }

        let (own_state, peer_state) = if own.lock_key() > peer.lock_key() {
            let own_state = own.lock_owned().await;
            let peer_state = peer.lock_owned().await;
            (own_state, peer_state)
        } else {
            let peer_state = peer.lock_owned().await;
            let own_state = own.lock_owned().await;
            (own_state, peer_state)
        };

        Ok(LockedPair {
            own: own.clone(),
            peer: peer.clone(),
            own_state,
            peer_state,
        })
    }

    /// Looks up the session named by `session`'s pairing.
    pub async fn resolve_peer(
        &self,
        session: &SessionHandle,
    ) -> Result<SessionHandle, SessionError> {
        let peer_name = session
            .lock()
            .await
            .peer_name()
            .map(str::to_owned)
            .ok_or(SessionError::PairingNotEstablished)?;

        self.directory
            .lookup_by_name(&peer_name)
            .await
            .ok_or(SessionError::PairingNotEstablished)
    }

    async fn lock_with_peer(&self, session: &SessionHandle) -> Result<LockedPair, SessionError> {
        let peer = self.resolve_peer(session).await?;
        let pair = self.lock_pair(session, &peer).await?;
        if !pair.is_mutually_paired() {
            return Err(SessionError::PairingNotEstablished);
        }
        Ok(pair)
    }

    /// Records the caller's intent to pair with `callee` and notifies the callee.
    #[instrument(skip_all, fields(caller = %caller.name(), callee = %callee.name()))]
    pub async fn propose(
        &self,
        caller: &SessionHandle,
        callee: &SessionHandle,
        sdp_offer: String,
    ) -> Result<(), SessionError> {
        let mut pair = self.lock_pair(caller, callee).await?;

        if pair.peer_state.phase().is_engaged() {
            return Err(SessionError::PeerBusy(callee.name().to_string()));
        }
        if pair.own_state.phase().is_engaged() {
            return Err(SessionError::AlreadyPaired);
        }

        pair.own_state.call(callee.name(), sdp_offer);
        pair.peer_state.ring(caller.name());
        callee.send(OutboundMessage::IncomingPairing {
            from: caller.name().to_string(),
        });
        info!("Pairing proposed");
        Ok(())
    }

    /// Takes the caller's stored offer once the callee has accepted.
    pub async fn claim_offer(
        &self,
        caller: &SessionHandle,
        callee: &SessionHandle,
    ) -> Result<String, SessionError> {
        let mut pair = self.lock_pair(caller, callee).await?;
        if !pair.is_open_proposal() {
            return Err(SessionError::PairingNotEstablished);
        }
        pair.own_state
            .take_offer()
            .ok_or(SessionError::MissingOffer)
    }

    /// Drops an open proposal from `caller` to `callee`.
    #[instrument(skip_all, fields(caller = %caller.name(), callee = %callee.name()))]
    pub async fn decline(
        &self,
        caller: &SessionHandle,
        callee: &SessionHandle,
    ) -> Result<(), SessionError> {
        let mut pair = self.lock_pair(caller, callee).await?;
        if !pair.is_open_proposal() {
            return Err(SessionError::PairingNotEstablished);
        }
        pair.each_state(Session::reset);
        info!("Pairing declined");
        Ok(())
    }

    /// Turns an open proposal into an active pairing waiting for media
    /// confirmation. Returns the pairing's identifier.
    #[instrument(skip_all, fields(caller = %caller.name(), callee = %callee.name()))]
    pub async fn establish(
        &self,
        caller: &SessionHandle,
        callee: &SessionHandle,
    ) -> Result<Uuid, SessionError> {
        let mut pair = self.lock_pair(caller, callee).await?;
        if !pair.is_open_proposal() {
            return Err(SessionError::PairingNotEstablished);
        }

        let pairing_id = Uuid::new_v4();
        pair.each_state(|state| state.engage(pairing_id));
        info!(%pairing_id, "Pairing established");
        Ok(pairing_id)
    }

    /// Hands each side its SDP answer, provided the pair still belongs to
    /// `pairing_id`. Sent under the pair lock so a concurrent stop is seen
    /// either before or after both answers.
    pub async fn announce(
        &self,
        caller: &SessionHandle,
        callee: &SessionHandle,
        pairing_id: Uuid,
        caller_answer: String,
        callee_answer: String,
    ) -> Result<(), SessionError> {
        let pair = self.lock_pair(caller, callee).await?;
        if !pair.is_current(pairing_id) {
            return Err(SessionError::PairingNotEstablished);
        }

        callee.send(OutboundMessage::MediaStart {
            sdp_answer: callee_answer,
        });
        caller.send(OutboundMessage::pairing_accepted(caller_answer));
        Ok(())
    }

    /// Marks `session` as arrived at a barrier. Returns the locked pair once
    /// both sides have arrived, `None` while the peer has not.
    async fn arrive(
        &self,
        session: &SessionHandle,
        waiting: Phase,
    ) -> Result<Option<LockedPair>, SessionError> {
        let arrived = waiting.arrived().unwrap_or(waiting);
        {
            let mut state = session.lock().await;
            let own = state.phase();
            if own == waiting {
                state.set_phase(arrived);
            } else if own != arrived {
                return Err(SessionError::PhaseMismatch {
                    expected: waiting,
                    own,
                    peer: None,
                });
            }
        }

        let pair = self.lock_with_peer(session).await?;
        let (own, peer) = (pair.own_state.phase(), pair.peer_state.phase());
        if own == arrived && peer == arrived {
            Ok(Some(pair))
        } else if own == arrived && peer == waiting {
            debug!(%arrived, "Waiting for peer");
            Ok(None)
        } else if own > arrived && peer > arrived {
            debug!(%arrived, "Peer already crossed the barrier");
            Ok(None)
        } else {
            Err(pair.mismatch(arrived))
        }
    }

    /// Barrier out of media setup. Assigns roles once both sides confirmed.
    #[instrument(skip_all, fields(user = %session.name()))]
    pub async fn confirm_media_ready(&self, session: &SessionHandle) -> Result<(), SessionError> {
        let Some(mut pair) = self.arrive(session, Phase::AwaitMediaConfirm).await? else {
            return Ok(());
        };
        pair.advance_both(Phase::AwaitRoundStart);

        let own_role = Role::for_pair(pair.own.name(), pair.peer.name());
        let peer_role = own_role.counterpart();
        pair.own_state.set_role(own_role);
        pair.peer_state.set_role(peer_role);

        pair.own.send(OutboundMessage::RoleAssignment { role: own_role });
        pair.peer.send(OutboundMessage::RoleAssignment { role: peer_role });
        info!(%own_role, %peer_role, "Roles assigned");
        Ok(())
    }

    /// Barrier into the round. Hands out the round content and opens the
    /// review window.
    #[instrument(skip_all, fields(user = %session.name()))]
    pub async fn start_round(&self, session: &SessionHandle) -> Result<(), SessionError> {
        let Some(mut pair) = self.arrive(session, Phase::AwaitRoundStart).await? else {
            return Ok(());
        };
        let pairing_id = pair.pairing_id().ok_or(SessionError::PairingNotEstablished)?;
        pair.advance_both(Phase::ReviewPrompt);

        let content = self.catalog.select(pair.own.name(), pair.peer.name());
        pair.each_state(|state| state.round_mut().content = Some(content.clone()));

        pair.send_to_role(Role::Interrogator, OutboundMessage::StartReview { src: None });
        pair.send_to_role(
            Role::Describer,
            OutboundMessage::StartReview {
                src: Some(content.image.clone()),
            },
        );

        let window = self.clone().run_review_window(
            pair.own.clone(),
            pair.peer.clone(),
            pairing_id,
        );
        Self::arm(&mut pair, window, info_span!("review_window", %pairing_id));
        Ok(())
    }

    /// Stores the first decision on both sides and, once the pair is waiting
    /// for it, reveals the hint and opens the second window.
    #[instrument(skip_all, fields(user = %session.name()))]
    pub async fn submit_first_decision(
        &self,
        session: &SessionHandle,
        decision: String,
    ) -> Result<(), SessionError> {
        let mut pair = self.lock_with_peer(session).await?;
        pair.each_state(|state| state.round_mut().first_decision = Some(decision.clone()));

        if !pair.both_in(Phase::FirstResponse) {
            return Err(pair.mismatch(Phase::FirstResponse));
        }
        let pairing_id = pair.pairing_id().ok_or(SessionError::PairingNotEstablished)?;
        pair.advance_both(Phase::SecondQuery);

        match pair.own_state.round().content.as_ref() {
            Some(content) => pair.send_to_role(
                Role::Interrogator,
                OutboundMessage::Hint {
                    hint: content.hint.clone(),
                },
            ),
            None => warn!("Round has no content to hint at"),
        }
        pair.send_both(OutboundMessage::StartSecondQuery);

        let window = self.clone().run_second_window(
            pair.own.clone(),
            pair.peer.clone(),
            pairing_id,
        );
        Self::arm(&mut pair, window, info_span!("second_window", %pairing_id));
        Ok(())
    }

    /// Stores the second decision on both sides and closes the round once the
    /// pair is waiting for it.
    #[instrument(skip_all, fields(user = %session.name()))]
    pub async fn submit_second_decision(
        &self,
        session: &SessionHandle,
        decision: String,
    ) -> Result<(), SessionError> {
        let mut pair = self.lock_with_peer(session).await?;
        pair.each_state(|state| state.round_mut().second_decision = Some(decision.clone()));

        if !pair.both_in(Phase::SecondResponse) {
            return Err(pair.mismatch(Phase::SecondResponse));
        }
        pair.advance_both(Phase::PostSession);
        pair.send_both(OutboundMessage::StartPostSession);
        info!("Round finished");
        Ok(())
    }

    /// Ends whatever pairing `session` is part of. The peer, if it still
    /// points back, is reset too and told with `peerStopped`.
    ///
    /// Returns the notified peer.
    #[instrument(skip_all, fields(user = %session.name()))]
    pub async fn end_pairing(&self, session: &SessionHandle) -> Option<SessionHandle> {
        let peer = match self.resolve_peer(session).await {
            Ok(peer) if !peer.same_as(session) => peer,
            _ => {
                let mut state = session.lock().await;
                state.cancel_timer();
                state.reset();
                debug!("No peer to notify");
                return None;
            }
        };

        let mut pair = match self.lock_pair(session, &peer).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Could not lock pair");
                return None;
            }
        };

        let mutual = pair.is_mutually_paired();
        pair.own_state.cancel_timer();
        pair.own_state.reset();
        if !mutual {
            debug!(peer = %peer.name(), "Peer no longer paired with us");
            return None;
        }

        pair.peer_state.cancel_timer();
        pair.peer_state.reset();
        peer.send(OutboundMessage::PeerStopped);
        info!(peer = %peer.name(), "Pairing ended");
        Some(peer)
    }

    fn arm<F>(pair: &mut LockedPair, window: F, span: tracing::Span)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(window.instrument(span));
        pair.own_state.arm_timer(task.abort_handle());
        pair.peer_state.arm_timer(task.abort_handle());
    }

    async fn run_review_window(self, a: SessionHandle, b: SessionHandle, pairing_id: Uuid) {
        let review = TimedStep {
            delay: self.durations.review,
            from: Phase::ReviewPrompt,
            to: Phase::FirstQuery,
        };
        let opened = self
            .advance_after(&a, &b, pairing_id, review, |pair| {
                pair.send_both(OutboundMessage::StartFirstQuery)
            })
            .await;
        if !opened {
            return;
        }

        let first_query = TimedStep {
            delay: self.durations.first_query,
            from: Phase::FirstQuery,
            to: Phase::FirstResponse,
        };
        self.advance_after(&a, &b, pairing_id, first_query, |pair| {
            pair.send_to_role(Role::Interrogator, OutboundMessage::GetFirstDecision)
        })
        .await;
    }

    async fn run_second_window(self, a: SessionHandle, b: SessionHandle, pairing_id: Uuid) {
        let second_query = TimedStep {
            delay: self.durations.second_query,
            from: Phase::SecondQuery,
            to: Phase::SecondResponse,
        };
        self.advance_after(&a, &b, pairing_id, second_query, |pair| {
            pair.send_to_role(Role::Interrogator, OutboundMessage::GetSecondDecision)
        })
        .await;
    }

    /// Waits out the step's delay, then advances the pair if it is still the
    /// same pairing in the same phase. Returns whether it advanced.
    async fn advance_after(
        &self,
        a: &SessionHandle,
        b: &SessionHandle,
        pairing_id: Uuid,
        step: TimedStep,
        effect: impl FnOnce(&LockedPair),
    ) -> bool {
        tokio::time::sleep(step.delay).await;

        match self.try_advance(a, b, pairing_id, step, effect).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, from = %step.from, to = %step.to, "Timed advance skipped");
                false
            }
        }
    }

    async fn try_advance(
        &self,
        a: &SessionHandle,
        b: &SessionHandle,
        pairing_id: Uuid,
        step: TimedStep,
        effect: impl FnOnce(&LockedPair),
    ) -> Result<(), SessionError> {
        let mut pair = self.lock_pair(a, b).await?;
        if !pair.is_current(pairing_id) {
            return Err(SessionError::StaleTimer);
        }
        if !pair.both_in(step.from) {
            return Err(pair.mismatch(step.from));
        }
        pair.advance_both(step.to);
        effect(&pair);
        Ok(())
    }
}

/// A phase change that happens on its own after `delay`.
#[derive(Debug, Clone, Copy)]
struct TimedStep {
    delay: Duration,
    from: Phase,
    to: Phase,
}
