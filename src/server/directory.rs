use crate::model::{ConnectionId, OutboundSender, SessionError, SessionHandle};
use async_trait::async_trait;

/// Index of connected participants by display name and by connection.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Creates and indexes a session. Fails on an empty or taken name, or when
    /// the connection already has a session.
    async fn register(
        &self,
        name: &str,
        connection_id: ConnectionId,
        channel: OutboundSender,
    ) -> Result<SessionHandle, SessionError>;

    async fn lookup_by_name(&self, name: &str) -> Option<SessionHandle>;

    async fn lookup_by_connection(&self, connection_id: ConnectionId) -> Option<SessionHandle>;

    /// Removes the session from both indices and returns it.
    async fn remove_by_connection(&self, connection_id: ConnectionId) -> Option<SessionHandle>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
