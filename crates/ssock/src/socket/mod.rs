//! Unix domain socket client
//!
//! This module talks to a local stream socket using a minimal
//! request/reply contract:
//!
//! 1. Client writes the message bytes followed by a single NUL byte
//! 2. Client performs one read of at most [`PAYLOAD_CAP`] bytes
//! 3. Whatever that read returns is the reply
//!
//! There is no length prefix or other framing; the meaning of the bytes is
//! up to the peer.
//!
//! ## Architecture
//!
//! - `SocketClient`: owns the connection and performs exchanges
//! - `SocketAddress`, `Message`, `Reply`: validated, length-checked values
//! - `ClientError`: error types for every step of a run

mod client;
mod error;
mod types;

pub use client::SocketClient;
pub use error::{ClientError, EXIT_CONNECT, EXIT_EXCHANGE, EXIT_IO, EXIT_USAGE};
pub use types::{Message, Reply, SocketAddress, MAX_MESSAGE_LEN, PAYLOAD_CAP};
