//! One client run: connect, exchange every message, close
//!
//! The transcript (`Connecting to`, `Connected`, `Message:` and `Received:`
//! lines) goes to the writer passed in, normally stdout. Diagnostics go
//! through `tracing`.

use std::ffi::OsString;
use std::io::Write;

use clap::ValueEnum;
use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use crate::input::LineMessages;
use crate::socket::{ClientError, Message, SocketAddress, SocketClient};

/// Where the messages of a run come from
pub enum MessageSource<R> {
    /// A single message built from command-line words
    Single(Message),
    /// One message per input line until end of input
    Lines(R),
}

impl<R> MessageSource<R> {
    /// Pick the source from the words following the address
    ///
    /// No words means line mode on `lines`; otherwise the words are joined
    /// into exactly one message. Words are taken as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MessageTooLong` if the joined words do not fit
    /// in one payload.
    pub fn from_words(words: &[OsString], lines: R) -> Result<Self, ClientError> {
        if words.is_empty() {
            Ok(Self::Lines(lines))
        } else {
            Message::from_words(words).map(Self::Single)
        }
    }
}

/// What line mode does when one exchange fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Log the failure and go on with the next line
    #[default]
    Continue,
    /// Stop at the first failed exchange
    Abort,
}

/// Counts of a line-mode run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeSummary {
    pub attempted: usize,
    pub failed: usize,
}

impl ExchangeSummary {
    fn into_result(self) -> Result<Self, ClientError> {
        if self.failed > 0 {
            Err(ClientError::ExchangesFailed {
                failed: self.failed,
                attempted: self.attempted,
            })
        } else {
            Ok(self)
        }
    }
}

/// Connect to `address`, exchange every message from `source`, then close
///
/// The connection is closed after the last exchange whether or not the
/// exchanges succeeded.
///
/// # Errors
///
/// Returns `ClientError::ConnectionFailed` without attempting any exchange
/// if the socket cannot be reached. Otherwise returns the first error that
/// ended the run, or `ClientError::ExchangesFailed` if line mode skipped
/// failed exchanges.
pub async fn run<R, W>(
    address: &SocketAddress,
    source: MessageSource<R>,
    policy: OnError,
    out: &mut W,
) -> Result<ExchangeSummary, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Connecting to {}", address).map_err(ClientError::OutputFailed)?;
    let mut client = SocketClient::connect(address).await?;
    writeln!(out, "Connected").map_err(ClientError::OutputFailed)?;

    let result = match source {
        MessageSource::Single(message) => exchange_and_report(&mut client, &message, out)
            .await
            .map(|()| ExchangeSummary {
                attempted: 1,
                failed: 0,
            }),
        MessageSource::Lines(reader) => {
            let mut messages = LineMessages::new(reader);
            run_lines(&mut client, &mut messages, policy, out).await
        }
    };

    client.close().await;
    result
}

/// Exchange one message per input line until input is exhausted
///
/// # Errors
///
/// Returns `ClientError::InputFailed` or `ClientError::OutputFailed`
/// immediately. Exchange failures either stop the run (`OnError::Abort`) or
/// are counted and reported as `ClientError::ExchangesFailed` once input is
/// exhausted (`OnError::Continue`).
pub async fn run_lines<R, W>(
    client: &mut SocketClient,
    messages: &mut LineMessages<R>,
    policy: OnError,
    out: &mut W,
) -> Result<ExchangeSummary, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut summary = ExchangeSummary::default();

    while let Some(message) = messages
        .next_message()
        .await
        .map_err(ClientError::InputFailed)?
    {
        summary.attempted += 1;

        match exchange_and_report(client, &message, out).await {
            Ok(()) => {}
            Err(e) if e.is_exchange_failure() => {
                summary.failed += 1;
                match policy {
                    OnError::Abort => return Err(e),
                    OnError::Continue => {
                        warn!(
                            line = summary.attempted,
                            error = %e,
                            "Exchange failed, continuing with next line"
                        );
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        attempted = summary.attempted,
        failed = summary.failed,
        "Input exhausted"
    );

    summary.into_result()
}

/// Perform one exchange and write its `Message:`/`Received:` pair
///
/// Nothing is written when the exchange fails.
async fn exchange_and_report<W: Write>(
    client: &mut SocketClient,
    message: &Message,
    out: &mut W,
) -> Result<(), ClientError> {
    let reply = client.exchange(message).await?;

    writeln!(out, "Message: {}", message).map_err(ClientError::OutputFailed)?;
    writeln!(out, "Received: {}", reply).map_err(ClientError::OutputFailed)?;

    Ok(())
}
