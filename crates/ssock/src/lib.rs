//! Client for Unix domain stream sockets
//!
//! Opens one connection, sends messages given on the command line or read
//! from stdin, and reports each reply.

pub mod input;
pub mod session;
pub mod socket;

pub use session::{run, ExchangeSummary, MessageSource, OnError};
pub use socket::{ClientError, Message, Reply, SocketAddress, SocketClient};
