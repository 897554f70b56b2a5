use super::{MediaSessionGateway, MediaSessionHandle};
use crate::model::ConnectionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

/// Media sessions owned by each connection.
///
/// Both members of a call point at the same handle; taking it through either
/// connection removes every entry for that handle so it is released once.
#[derive(Clone, Default)]
pub struct MediaSessionTable {
    entries: Arc<RwLock<HashMap<ConnectionId, MediaSessionHandle>>>,
}

impl MediaSessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handle` for `connection_id`, returning the handle it replaced.
    pub async fn insert(
        &self,
        connection_id: ConnectionId,
        handle: MediaSessionHandle,
    ) -> Option<MediaSessionHandle> {
        self.entries.write().await.insert(connection_id, handle)
    }

    pub async fn get(&self, connection_id: ConnectionId) -> Option<MediaSessionHandle> {
        self.entries.read().await.get(&connection_id).copied()
    }

    pub async fn take(&self, connection_id: ConnectionId) -> Option<MediaSessionHandle> {
        let mut entries = self.entries.write().await;
        let handle = entries.remove(&connection_id)?;
        entries.retain(|_, other| *other != handle);
        Some(handle)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Removes the connection's media session and releases it on the gateway.
    #[instrument(skip(self, gateway))]
    pub async fn release(&self, gateway: &dyn MediaSessionGateway, connection_id: ConnectionId) {
        let Some(handle) = self.take(connection_id).await else {
            debug!("No media session to release");
            return;
        };
        if let Err(e) = gateway.release(handle).await {
            error!(%handle, error = %e, "Failed to release media session");
        }
    }
}
