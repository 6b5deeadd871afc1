//! WebSocket session coordinator for live quizzes

mod actor;
mod messages;
mod server;
mod types;

pub use actor::SessionHandle;
pub use messages::{ClientEvent, ServerEvent, SessionDecl};
pub use server::{DEFAULT_SESSION_PORT, SessionServer};
pub use types::{AdmissionError, ClientId, OutboundMessage, Role};
