//! Pure Rust async client for the [Minecraft Query Protocol](https://wiki.vg/Query),
//! the GameSpy 4 style UDP protocol servers use to report their status and player list.
pub mod error;
pub mod packet;
mod parse;
mod query;
pub mod status;
pub mod transport;

pub use error::{ErrorKind, QueryError};
pub use query::{query, Session, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use status::{ModPlugins, StatusResponse};
