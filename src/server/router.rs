use super::{PairSynchronizer, ParticipantDirectory};
use crate::config::PhaseDurations;
use crate::media::{MediaError, MediaSessionGateway, MediaSessionHandle, MediaSessionTable, MediaSide};
use crate::model::{
    CallResponse, ConnectionId, ContentCatalog, InboundMessage, OutboundMessage, OutboundSender,
    SessionError, SessionHandle,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Dispatches inbound messages to the operation their tag names and turns the
/// outcome into replies.
#[derive(Clone)]
pub struct ProtocolRouter {
    directory: Arc<dyn ParticipantDirectory>,
    synchronizer: PairSynchronizer,
    gateway: Arc<dyn MediaSessionGateway>,
    media: MediaSessionTable,
}

impl ProtocolRouter {
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        gateway: Arc<dyn MediaSessionGateway>,
        catalog: Arc<dyn ContentCatalog>,
        durations: PhaseDurations,
    ) -> Self {
        Self {
            synchronizer: PairSynchronizer::new(directory.clone(), catalog, durations),
            directory,
            gateway,
            media: MediaSessionTable::new(),
        }
    }

    pub fn directory(&self) -> &Arc<dyn ParticipantDirectory> {
        &self.directory
    }

    pub fn synchronizer(&self) -> &PairSynchronizer {
        &self.synchronizer
    }

    pub fn media(&self) -> &MediaSessionTable {
        &self.media
    }

    #[instrument(skip(self, channel, message), fields(kind = message.kind()))]
    pub async fn route(
        &self,
        connection_id: ConnectionId,
        channel: &OutboundSender,
        message: InboundMessage,
    ) {
        debug!("Routing message");
        match message {
            InboundMessage::Register { name } => {
                self.register(connection_id, channel, &name).await;
            }
            InboundMessage::InitiatePairing {
                to,
                from,
                sdp_offer,
            } => {
                if let Err(e) = self
                    .initiate_pairing(connection_id, &to, &from, sdp_offer)
                    .await
                {
                    warn!(%to, error = %e, "Pairing request rejected");
                    reply(channel, OutboundMessage::pairing_rejected(&e));
                }
            }
            InboundMessage::PairingResponse {
                call_response,
                from,
                sdp_offer,
            } => {
                if let Err(e) = self
                    .respond_to_pairing(connection_id, &from, call_response, sdp_offer)
                    .await
                {
                    warn!(%from, error = %e, "Pairing response failed");
                    reply(channel, OutboundMessage::pairing_rejected(&e));
                }
            }
            InboundMessage::Play { user, sdp_offer } => {
                match self.play(connection_id, &user, sdp_offer).await {
                    Ok(sdp_answer) => reply(channel, OutboundMessage::play_accepted(sdp_answer)),
                    Err(e) => {
                        warn!(%user, error = %e, "Playback rejected");
                        reply(channel, OutboundMessage::play_rejected(&e));
                    }
                }
            }
            InboundMessage::StopPlayback => {
                self.media.release(self.gateway.as_ref(), connection_id).await;
            }
            InboundMessage::Stop => self.stop(connection_id).await,
            InboundMessage::ConfirmMediaReady
            | InboundMessage::StartRound
            | InboundMessage::SubmitFirstDecision { .. }
            | InboundMessage::SubmitSecondDecision { .. } => {
                self.drive(connection_id, message).await;
            }
            InboundMessage::Unknown => warn!("Ignoring message with unknown id"),
        }
    }

    /// Connection closed: drops the participant, ends its pairing and
    /// releases its media.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        if let Some(session) = self.directory.remove_by_connection(connection_id).await {
            self.synchronizer.end_pairing(&session).await;
            info!(user = %session.name(), "Participant disconnected");
        }
        self.media.release(self.gateway.as_ref(), connection_id).await;
    }

    async fn sender(&self, connection_id: ConnectionId) -> Result<SessionHandle, SessionError> {
        self.directory
            .lookup_by_connection(connection_id)
            .await
            .ok_or(SessionError::NotRegistered)
    }

    async fn register(&self, connection_id: ConnectionId, channel: &OutboundSender, name: &str) {
        match self
            .directory
            .register(name, connection_id, channel.clone())
            .await
        {
            Ok(_) => {
                info!(%name, "Registered");
                reply(channel, OutboundMessage::registration_accepted());
            }
            Err(e) => {
                warn!(%name, error = %e, "Registration rejected");
                reply(channel, OutboundMessage::registration_rejected(&e));
            }
        }
    }

    async fn initiate_pairing(
        &self,
        connection_id: ConnectionId,
        to: &str,
        from: &str,
        sdp_offer: String,
    ) -> Result<(), SessionError> {
        let caller = self.sender(connection_id).await?;
        if from != caller.name() {
            warn!(claimed = %from, registered = %caller.name(), "Using registered name as caller");
        }
        if to == caller.name() {
            return Err(SessionError::CannotPairWithSelf);
        }

        let callee = self
            .directory
            .lookup_by_name(to)
            .await
            .ok_or_else(|| SessionError::PeerNotFound(to.to_string()))?;

        self.synchronizer.propose(&caller, &callee, sdp_offer).await
    }

    async fn respond_to_pairing(
        &self,
        connection_id: ConnectionId,
        from: &str,
        call_response: CallResponse,
        sdp_offer: Option<String>,
    ) -> Result<(), SessionError> {
        let callee = self.sender(connection_id).await?;
        let caller = self
            .directory
            .lookup_by_name(from)
            .await
            .ok_or_else(|| SessionError::PeerNotFound(from.to_string()))?;

        match call_response {
            CallResponse::Decline => {
                self.synchronizer.decline(&caller, &callee).await?;
                caller.send(OutboundMessage::pairing_declined());
                Ok(())
            }
            CallResponse::Accept => {
                let caller_offer = self.synchronizer.claim_offer(&caller, &callee).await?;
                if let Err(e) = self
                    .connect_media(&caller, &callee, caller_offer, sdp_offer)
                    .await
                {
                    if let Err(teardown) = self.synchronizer.decline(&caller, &callee).await {
                        debug!(error = %teardown, "Proposal already gone");
                    }
                    caller.send(OutboundMessage::pairing_rejected(&e));
                    return Err(e);
                }
                Ok(())
            }
        }
    }

    /// Sets up the paired media session, then activates the pairing and
    /// hands each side its answer.
    #[instrument(skip_all, fields(caller = %caller.name(), callee = %callee.name()))]
    async fn connect_media(
        &self,
        caller: &SessionHandle,
        callee: &SessionHandle,
        caller_offer: String,
        callee_offer: Option<String>,
    ) -> Result<(), SessionError> {
        let callee_offer = callee_offer.ok_or(SessionError::MissingOffer)?;
        let handle = self
            .gateway
            .create_paired_session(caller.name(), callee.name())
            .await?;

        let answers = self
            .negotiate_pair(handle, &caller_offer, &callee_offer)
            .await;
        let (caller_answer, callee_answer) = match answers {
            Ok(answers) => answers,
            Err(e) => {
                self.discard(handle).await;
                return Err(e.into());
            }
        };

        // Entries go in before the pairing exists so a stop or disconnect from
        // here on finds the handle and releases it.
        for connection_id in [caller.connection_id(), callee.connection_id()] {
            self.media.release(self.gateway.as_ref(), connection_id).await;
            self.media.insert(connection_id, handle).await;
        }

        let announced = match self.synchronizer.establish(caller, callee).await {
            Ok(pairing_id) => {
                self.synchronizer
                    .announce(caller, callee, pairing_id, caller_answer, callee_answer)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = announced {
            warn!(error = %e, "Pairing ended while connecting media");
            self.media
                .release(self.gateway.as_ref(), caller.connection_id())
                .await;
            return Err(e);
        }

        if let Err(e) = self.gateway.start_recording(handle).await {
            error!(%handle, error = %e, "Failed to start recording");
        }
        Ok(())
    }

    async fn negotiate_pair(
        &self,
        handle: MediaSessionHandle,
        caller_offer: &str,
        callee_offer: &str,
    ) -> Result<(String, String), MediaError> {
        let callee_answer = self
            .gateway
            .negotiate(handle, MediaSide::Callee, callee_offer)
            .await?;
        let caller_answer = self
            .gateway
            .negotiate(handle, MediaSide::Caller, caller_offer)
            .await?;
        Ok((caller_answer, callee_answer))
    }

    async fn discard(&self, handle: MediaSessionHandle) {
        if let Err(e) = self.gateway.release(handle).await {
            error!(%handle, error = %e, "Failed to release media session");
        }
    }

    async fn play(
        &self,
        connection_id: ConnectionId,
        user: &str,
        sdp_offer: String,
    ) -> Result<String, SessionError> {
        let viewer = self.sender(connection_id).await?;
        if viewer.lock().await.phase().is_engaged() {
            return Err(SessionError::AlreadyPaired);
        }
        let recorded = self
            .directory
            .lookup_by_name(user)
            .await
            .ok_or_else(|| SessionError::PeerNotFound(user.to_string()))?;

        self.media.release(self.gateway.as_ref(), connection_id).await;
        let handle = self
            .gateway
            .create_playback_session(recorded.name())
            .await?;

        match self.start_playback(handle, &sdp_offer).await {
            Ok(sdp_answer) => {
                self.media.insert(connection_id, handle).await;
                info!(%handle, %user, "Playback started");
                Ok(sdp_answer)
            }
            Err(e) => {
                self.discard(handle).await;
                Err(e.into())
            }
        }
    }

    async fn start_playback(
        &self,
        handle: MediaSessionHandle,
        sdp_offer: &str,
    ) -> Result<String, MediaError> {
        let sdp_answer = self
            .gateway
            .negotiate(handle, MediaSide::Viewer, sdp_offer)
            .await?;
        self.gateway.start_playback(handle).await?;
        Ok(sdp_answer)
    }

    async fn stop(&self, connection_id: ConnectionId) {
        match self.sender(connection_id).await {
            Ok(session) => {
                self.synchronizer.end_pairing(&session).await;
            }
            Err(e) => warn!(error = %e, "Ignoring stop"),
        }
        self.media.release(self.gateway.as_ref(), connection_id).await;
    }

    /// Messages that move a pairing along. Their failures are never answered.
    async fn drive(&self, connection_id: ConnectionId, message: InboundMessage) {
        let kind = message.kind();
        let session = match self.sender(connection_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(kind, error = %e, "Ignoring message");
                return;
            }
        };

        let result = match message {
            InboundMessage::ConfirmMediaReady => {
                self.synchronizer.confirm_media_ready(&session).await
            }
            InboundMessage::StartRound => self.synchronizer.start_round(&session).await,
            InboundMessage::SubmitFirstDecision { decision } => {
                self.synchronizer
                    .submit_first_decision(&session, decision)
                    .await
            }
            InboundMessage::SubmitSecondDecision { decision } => {
                self.synchronizer
                    .submit_second_decision(&session, decision)
                    .await
            }
            _ => Ok(()),
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_sync_race() => warn!(kind, error = %e, "Pair out of sync"),
            Err(e) => warn!(kind, error = %e, "Message had no effect"),
        }
    }
}

fn reply(channel: &OutboundSender, message: OutboundMessage) {
    debug!(?message, "Replying");
    if let Err(e) = channel.send(message) {
        debug!(error = %e, "Reply channel closed");
    }
}
