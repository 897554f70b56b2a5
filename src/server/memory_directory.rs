use super::ParticipantDirectory;
use crate::model::{ConnectionId, OutboundSender, SessionError, SessionHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

#[derive(Default)]
struct Indices {
    by_name: HashMap<String, SessionHandle>,
    by_connection: HashMap<ConnectionId, SessionHandle>,
}

/// In-memory directory. Both indices sit behind one lock so a registration
/// checks and inserts atomically.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    indices: Arc<RwLock<Indices>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.read().await.by_name.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ParticipantDirectory for MemoryDirectory {
    #[instrument(skip(self, channel))]
    async fn register(
        &self,
        name: &str,
        connection_id: ConnectionId,
        channel: OutboundSender,
    ) -> Result<SessionHandle, SessionError> {
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }

        let mut indices = self.indices.write().await;
        if indices.by_name.contains_key(name) {
            debug!("Name taken");
            return Err(SessionError::NameAlreadyRegistered(name.to_string()));
        }
        if indices.by_connection.contains_key(&connection_id) {
            debug!("Connection already has a session");
            return Err(SessionError::ConnectionAlreadyRegistered);
        }

        let session = SessionHandle::new(name, connection_id, channel);
        indices.by_name.insert(name.to_string(), session.clone());
        indices.by_connection.insert(connection_id, session.clone());
        info!(participants = indices.by_name.len(), "Participant registered");
        Ok(session)
    }

    async fn lookup_by_name(&self, name: &str) -> Option<SessionHandle> {
        self.indices.read().await.by_name.get(name).cloned()
    }

    async fn lookup_by_connection(&self, connection_id: ConnectionId) -> Option<SessionHandle> {
        self.indices
            .read()
            .await
            .by_connection
            .get(&connection_id)
            .cloned()
    }

    #[instrument(skip(self))]
    async fn remove_by_connection(&self, connection_id: ConnectionId) -> Option<SessionHandle> {
        let mut indices = self.indices.write().await;
        let session = indices.by_connection.remove(&connection_id)?;
        // a name is only dropped if it still points at this connection's session
        if indices
            .by_name
            .get(session.name())
            .is_some_and(|indexed| indexed.same_as(&session))
        {
            indices.by_name.remove(session.name());
        }
        info!(user = %session.name(), "Participant removed");
        Some(session)
    }

    async fn len(&self) -> usize {
        self.indices.read().await.by_name.len()
    }
}
