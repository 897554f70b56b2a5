mod connection_handler;
mod directory;
mod error;
mod memory_directory;
pub mod route;
mod router;
mod synchronizer;
pub mod telemetry;
pub mod websocket_listener;

pub use connection_handler::ConnectionHandler;
pub use directory::ParticipantDirectory;
pub use error::ServerError;
pub use memory_directory::MemoryDirectory;
pub use route::{create_session_route, CALL_PATH};
pub use router::ProtocolRouter;
pub use synchronizer::{LockedPair, PairSynchronizer};
pub use telemetry::{init_telemetry, shutdown_telemetry};
