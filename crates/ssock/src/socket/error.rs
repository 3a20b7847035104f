//! Error types for socket client operations

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Exit status for invocation errors (missing or invalid arguments)
pub const EXIT_USAGE: u8 = 1;

/// Exit status when the connection cannot be established
pub const EXIT_CONNECT: u8 = 2;

/// Exit status when one or more exchanges failed
pub const EXIT_EXCHANGE: u8 = 3;

/// Exit status when stdin or stdout failed
pub const EXIT_IO: u8 = 4;

/// Errors that can occur while talking to a Unix domain socket
#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    /// No socket path was given
    #[error("Socket address must not be empty")]
    #[diagnostic(code(ssock::address::empty))]
    EmptyAddress,

    /// The path cannot be stored in a `sockaddr_un`
    #[error("Invalid socket address {path}: {source}")]
    #[diagnostic(
        code(ssock::address::invalid),
        help("Unix socket paths are limited to the size of sun_path (usually 107 bytes)")
    )]
    InvalidAddress {
        path: PathBuf,
        #[source]
        source: nix::errno::Errno,
    },

    /// The message does not fit in one payload
    #[error("Message is {len} bytes long, at most {max} bytes fit in one payload")]
    #[diagnostic(code(ssock::message::too_long))]
    MessageTooLong { len: usize, max: usize },

    /// Failed to connect to the socket
    #[error("Failed to connect to {path}: {source}")]
    #[diagnostic(
        code(ssock::connect),
        help("Is a server listening on this socket?")
    )]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the message to the socket
    #[error("Failed to send message: {0}")]
    #[diagnostic(code(ssock::exchange::send))]
    SendFailed(#[source] std::io::Error),

    /// Failed to read the reply from the socket
    #[error("Failed to receive reply: {0}")]
    #[diagnostic(code(ssock::exchange::receive))]
    ReceiveFailed(#[source] std::io::Error),

    /// Line mode ran to the end of input but some exchanges failed
    #[error("{failed} of {attempted} exchanges failed")]
    #[diagnostic(code(ssock::exchange::failed))]
    ExchangesFailed { failed: usize, attempted: usize },

    /// Failed to read the next message from stdin
    #[error("Failed to read message from stdin: {0}")]
    #[diagnostic(code(ssock::io::input))]
    InputFailed(#[source] std::io::Error),

    /// Failed to write the transcript to stdout
    #[error("Failed to write output: {0}")]
    #[diagnostic(code(ssock::io::output))]
    OutputFailed(#[source] std::io::Error),
}

impl ClientError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyAddress | Self::InvalidAddress { .. } | Self::MessageTooLong { .. } => {
                EXIT_USAGE
            }
            Self::ConnectionFailed { .. } => EXIT_CONNECT,
            Self::SendFailed(_) | Self::ReceiveFailed(_) | Self::ExchangesFailed { .. } => {
                EXIT_EXCHANGE
            }
            Self::InputFailed(_) | Self::OutputFailed(_) => EXIT_IO,
        }
    }

    /// Whether this error belongs to a single exchange
    ///
    /// Only these errors are subject to the line-mode failure policy; every
    /// other error ends the run.
    pub fn is_exchange_failure(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::ReceiveFailed(_))
    }
}
