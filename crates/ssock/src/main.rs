//! ssock
//!
//! Sends messages to a Unix domain socket and prints each reply.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use ssock::socket::EXIT_USAGE;
use ssock::{ClientError, MessageSource, OnError, SocketAddress};

const EXAMPLES: &str = "\
If MESSAGE is omitted, stdin is read and every line is sent as one message.
Multiple messages can be sent over one connection using stdin.
Options are only recognized before ADDRESS; everything after it is message text.

Examples:
  ssock /tmp/mysocket hello
  echo \"hello\" | ssock /tmp/mysocket
  Both examples send \"hello\" to the server.";

/// Option that consumes the next argument as its value
const ON_ERROR_FLAG: &str = "--on-error";

#[derive(Parser, Debug)]
#[command(name = "ssock")]
#[command(about = "Send messages to a Unix domain socket and print the replies")]
#[command(version)]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// Path of the Unix domain socket to connect to
    address: Option<OsString>,

    /// Words joined with single spaces into one message
    message: Vec<OsString>,

    /// What to do when an exchange fails while reading lines from stdin
    #[arg(long, value_enum, default_value_t = OnError::Continue)]
    on_error: OnError,
}

/// Parse the command line
///
/// Only the arguments up to and including ADDRESS go through clap. The
/// rest are message words taken verbatim, so `ssock /tmp/app.sock --help`
/// sends `--help` instead of printing help.
fn parse_args<I>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = OsString>,
{
    let (head, words) = split_at_address(args);
    let mut cli = Cli::try_parse_from(head)?;
    cli.message = words;
    Ok(cli)
}

/// Split argv after the first positional argument
fn split_at_address<I>(args: I) -> (Vec<OsString>, Vec<OsString>)
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    // Program name
    let mut head: Vec<OsString> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let escape = arg == "--";
        let takes_value = arg == ON_ERROR_FLAG;
        let is_option = arg.len() > 1 && arg.as_bytes().starts_with(b"-");
        head.push(arg);

        if escape || takes_value {
            head.extend(args.next());
        }
        if escape || !is_option {
            break;
        }
    }

    (head, args.collect())
}

/// Exit status for a command line clap refused
///
/// Help and version requests are successful runs; anything else is a usage
/// error.
fn clap_exit(e: clap::Error) -> ExitCode {
    if let Err(print_err) = e.print() {
        tracing::warn!("Failed to print usage: {}", print_err);
    }
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_USAGE),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing; stdout carries the transcript, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => return clap_exit(e),
    };

    let Some(address) = cli.address.as_deref() else {
        // Usage goes to stdout, like --help
        if let Err(e) = Cli::command().print_help() {
            tracing::warn!("Failed to print usage: {}", e);
        }
        return ExitCode::from(EXIT_USAGE);
    };

    match run(address, &cli.message, cli.on_error).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}

async fn run(address: &OsStr, words: &[OsString], policy: OnError) -> Result<(), ClientError> {
    let address = SocketAddress::parse(address)?;
    let source = MessageSource::from_words(words, BufReader::new(tokio::io::stdin()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let summary = ssock::run(&address, source, policy, &mut out).await?;
    tracing::debug!(exchanges = summary.attempted, "Done");

    Ok(())
}
