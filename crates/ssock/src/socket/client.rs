//! Socket client implementation
//!
//! This module provides the `SocketClient`, which owns one connection and
//! performs write-then-read exchanges over it.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use super::types::{Message, Reply, SocketAddress, PAYLOAD_CAP};
use super::ClientError;

/// Client holding one open connection to a Unix domain stream socket
///
/// The connection is opened by [`SocketClient::connect`] and released either
/// explicitly by [`SocketClient::close`] or when the client is dropped.
///
/// No timeout is applied to any operation: an exchange with a peer that
/// never answers blocks until the peer answers or closes.
///
/// # Example
///
/// ```ignore
/// let address = SocketAddress::parse("/tmp/app.sock")?;
/// let mut client = SocketClient::connect(&address).await?;
/// let reply = client.exchange(&Message::new("ping")?).await?;
/// println!("{}", reply);
/// client.close().await;
/// ```
#[derive(Debug)]
pub struct SocketClient {
    stream: UnixStream,
    address: SocketAddress,
}

impl SocketClient {
    /// Connect to the socket at `address`
    ///
    /// # Errors
    ///
    /// Returns `ClientError::ConnectionFailed` if the socket does not exist,
    /// is not a socket, nobody listens on it, or access is denied.
    pub async fn connect(address: &SocketAddress) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(address.path())
            .await
            .map_err(|source| ClientError::ConnectionFailed {
                path: address.path().to_path_buf(),
                source,
            })?;

        debug!(address = %address, "Connected to socket");

        Ok(Self {
            stream,
            address: address.clone(),
        })
    }

    /// The address this client is connected to
    pub fn address(&self) -> &SocketAddress {
        &self.address
    }

    /// Send one message and read one reply
    ///
    /// Writes the message followed by its NUL terminator, then performs a
    /// single read of at most [`PAYLOAD_CAP`] bytes. A short read is not
    /// retried and a zero-length read (peer closed) yields an empty reply.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::SendFailed` if writing the message fails.
    /// Returns `ClientError::ReceiveFailed` if the read fails.
    pub async fn exchange(&mut self, message: &Message) -> Result<Reply, ClientError> {
        let wire = message.to_wire();

        self.stream
            .write_all(&wire)
            .await
            .map_err(ClientError::SendFailed)?;
        self.stream.flush().await.map_err(ClientError::SendFailed)?;

        let mut buffer = [0u8; PAYLOAD_CAP];
        let received = self
            .stream
            .read(&mut buffer)
            .await
            .map_err(ClientError::ReceiveFailed)?;

        debug!(sent = wire.len(), received, "Exchange complete");

        Ok(Reply::from_received(&buffer[..received]))
    }

    /// Shut the connection down and release it
    ///
    /// Consumes the client, so no exchange can follow. A failed shutdown is
    /// only logged: the socket is released when the stream drops either way.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(address = %self.address, error = %e, "Socket shutdown failed");
        } else {
            debug!(address = %self.address, "Connection closed");
        }
    }
}
