//! Media exchange is delegated to a gateway; the session core only sequences
//! calls to it around pairing acceptance, playback and teardown.

mod gateway;
mod loopback;
mod table;

pub use gateway::{MediaError, MediaSessionGateway, MediaSessionHandle, MediaSide};
pub use loopback::LoopbackGateway;
pub use table::MediaSessionTable;
