//! Values exchanged with the socket
//!
//! Both directions share one fixed payload cap. A message body is limited to
//! one byte less than the cap so that the body and its NUL terminator fit in
//! a single payload.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::sys::socket::UnixAddr;

use super::ClientError;

/// Maximum number of bytes in one payload, in either direction
pub const PAYLOAD_CAP: usize = 1024;

/// Maximum number of bytes in a message body (the terminator takes the last byte)
pub const MAX_MESSAGE_LEN: usize = PAYLOAD_CAP - 1;

/// Byte appended to every message on the wire
const TERMINATOR: u8 = 0;

/// Path of a Unix domain stream socket
///
/// Validated on construction: the path is non-empty and fits in
/// `sockaddr_un.sun_path` together with its trailing NUL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    path: PathBuf,
}

impl SocketAddress {
    /// Validate a socket path given on the command line
    ///
    /// A leading `~` is expanded to the home directory. Paths that are not
    /// valid UTF-8 are taken as they are.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EmptyAddress` for an empty string.
    /// Returns `ClientError::InvalidAddress` if the path is too long for a
    /// Unix socket address.
    pub fn parse<S: AsRef<OsStr> + ?Sized>(raw: &S) -> Result<Self, ClientError> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(ClientError::EmptyAddress);
        }

        let path: PathBuf = match raw.to_str() {
            Some(text) => shellexpand::tilde(text).into_owned().into(),
            None => raw.into(),
        };

        UnixAddr::new(path.as_path()).map_err(|source| ClientError::InvalidAddress {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path })
    }

    /// The socket path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One outgoing message body, at most [`MAX_MESSAGE_LEN`] bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    /// Create a message from raw bytes
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MessageTooLong` if the body does not fit in one
    /// payload together with its terminator.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ClientError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(ClientError::MessageTooLong {
                len: bytes.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(Self { bytes })
    }

    /// Join command-line words with single spaces into one message
    ///
    /// Words are joined byte for byte; they need not be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MessageTooLong` if the joined text is too long.
    pub fn from_words<S: AsRef<OsStr>>(words: &[S]) -> Result<Self, ClientError> {
        let joined = words
            .iter()
            .map(|word| word.as_ref().as_bytes())
            .collect::<Vec<&[u8]>>()
            .join(&b' ');
        Self::new(joined)
    }

    /// The message body, without terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytes written to the socket: the body followed by one NUL
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.bytes.len() + 1);
        wire.extend_from_slice(&self.bytes);
        wire.push(TERMINATOR);
        wire
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Bytes returned by one read from the socket
///
/// May be empty when the peer closed the connection without answering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    bytes: Vec<u8>,
}

impl Reply {
    pub(crate) fn from_received(received: &[u8]) -> Self {
        Self {
            bytes: received.to_vec(),
        }
    }

    /// Raw reply bytes as received
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reply text up to the first NUL byte
    ///
    /// Peers commonly answer with NUL-terminated strings (an echo server
    /// returns the terminator it was sent), so everything from the first NUL
    /// on is not part of the text.
    pub fn text(&self) -> String {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == TERMINATOR)
            .unwrap_or(self.bytes.len());
        String::from_utf8_lossy(&self.bytes[..end]).into_owned()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
