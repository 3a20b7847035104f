//! Line-by-line message source
//!
//! Splits a byte stream into messages at `\n`. A line longer than
//! [`MAX_MESSAGE_LEN`] is cut into consecutive messages of at most that
//! many bytes, so every message fits in one payload.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::socket::{Message, MAX_MESSAGE_LEN};

/// Reads messages from a buffered reader, one per line
pub struct LineMessages<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> LineMessages<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next message, or `None` at end of input
    ///
    /// The newline is not part of the message. An empty line is an empty
    /// message; a last line without newline is still returned.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if reading fails.
    pub async fn next_message(&mut self) -> io::Result<Option<Message>> {
        let mut line = Vec::new();

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                // End of input
                if line.is_empty() {
                    return Ok(None);
                }
                return Self::finish(line).map(Some);
            }

            let room = MAX_MESSAGE_LEN - line.len();
            let window = &available[..available.len().min(room)];

            if let Some(pos) = window.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&window[..pos]);
                self.reader.consume(pos + 1);
                return Self::finish(line).map(Some);
            }

            let taken = window.len();
            line.extend_from_slice(window);
            self.reader.consume(taken);

            if line.len() == MAX_MESSAGE_LEN {
                self.skip_newline().await?;
                return Self::finish(line).map(Some);
            }
        }
    }

    /// Consume a newline directly following a full-length chunk
    ///
    /// Without this a line of exactly `MAX_MESSAGE_LEN` bytes would be
    /// followed by a spurious empty message.
    async fn skip_newline(&mut self) -> io::Result<()> {
        let available = self.reader.fill_buf().await?;
        if available.first() == Some(&b'\n') {
            self.reader.consume(1);
        }
        Ok(())
    }

    fn finish(line: Vec<u8>) -> io::Result<Message> {
        // Lines are capped at MAX_MESSAGE_LEN above, so this cannot fail
        Message::new(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
