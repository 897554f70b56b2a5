pub mod config;
pub mod media;
pub mod model;
pub mod server;

pub mod prelude {
    pub use crate::config::{Config, PhaseDurations};
    pub use crate::media::{
        LoopbackGateway, MediaError, MediaSessionGateway, MediaSessionHandle, MediaSessionTable,
        MediaSide,
    };
    pub use crate::model::ConnectionId;
    pub use crate::model::ContentCatalog;
    pub use crate::model::InboundMessage;
    pub use crate::model::OutboundMessage;
    pub use crate::model::OutboundSender;
    pub use crate::model::Phase;
    pub use crate::model::Role;
    pub use crate::model::RoundContent;
    pub use crate::model::SessionError;
    pub use crate::model::SessionHandle;
    pub use crate::model::StaticCatalog;
    pub use crate::server::ConnectionHandler;
    pub use crate::server::MemoryDirectory;
    pub use crate::server::PairSynchronizer;
    pub use crate::server::ParticipantDirectory;
    pub use crate::server::ProtocolRouter;
}
