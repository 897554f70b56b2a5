mod content;
mod error;
mod message;
mod phase;
mod role;
mod session;

pub use content::{ContentCatalog, RoundContent, StaticCatalog};
pub use error::SessionError;
pub use message::{CallResponse, InboundMessage, OutboundMessage, Response};
pub use phase::Phase;
pub use role::Role;
pub use session::{ConnectionId, OutboundSender, Pairing, RoundData, Session, SessionHandle};
