use crate::model::{ConnectionId, InboundMessage, OutboundSender};
use crate::server::ProtocolRouter;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// One client connection: its identity, its outbound channel and the router
/// its messages go to.
#[derive(Clone)]
pub struct ConnectionHandler {
    connection_id: ConnectionId,
    sender: OutboundSender,
    router: ProtocolRouter,
}

impl ConnectionHandler {
    pub fn new(router: ProtocolRouter, sender: OutboundSender) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            sender,
            router,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    #[instrument(skip(self, message), fields(connection = %self.connection_id))]
    pub async fn handle_message(&self, message: InboundMessage) {
        self.router
            .route(self.connection_id, &self.sender, message)
            .await;
    }

    /// Parses a text frame and routes it.
    pub async fn handle_text(&self, text: &str) -> Result<(), serde_json::Error> {
        let message: InboundMessage = serde_json::from_str(text)?;
        debug!(kind = message.kind(), "Received message");
        self.handle_message(message).await;
        Ok(())
    }

    #[instrument(skip(self), fields(connection = %self.connection_id))]
    pub async fn disconnect(&self) {
        info!("Disconnecting");
        self.router.disconnect(self.connection_id).await;
    }
}
