use anyhow::{Context, bail};
use chat_stream::{
    ChatMessage, ChatRequest, ClientConfig, HttpTransport, Outcome, ReplayTransport,
    StreamSession, StreamUpdate, Transport,
};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat-stream", version, about = "Stream chat completions over SSE")]
struct Cli {
    /// TOML config file. Environment variables are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message and stream the answer
    Send {
        #[arg(long)]
        conversation_id: String,

        #[arg(long, default_value = "user")]
        role: String,

        /// Restrict the answer to these documents
        #[arg(long = "doc-id")]
        doc_ids: Vec<String>,

        message: String,
    },
    /// Feed a captured response body through the reassembler
    Replay {
        file: String,

        /// Bytes per simulated network chunk
        #[arg(long, default_value_t = 64)]
        chunk_size: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Send {
            conversation_id,
            role,
            doc_ids,
            message,
        } => {
            let config = match &cli.config {
                Some(path) => ClientConfig::from_file(path)?,
                None => ClientConfig::from_env()?,
            };
            let transport = HttpTransport::new(config).context("Invalid client configuration")?;
            info!(url = transport.url(), "Using completion endpoint");

            let mut msg = ChatMessage::user(message);
            msg.role = role;
            msg.conversation_id = Some(conversation_id.clone());
            if !doc_ids.is_empty() {
                msg.doc_ids = Some(doc_ids);
            }
            let request = ChatRequest::new(conversation_id, vec![msg]);

            let session = StreamSession::new();
            let cancel = session.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });

            let mut printer = AnswerPrinter::default();
            print_stream(session, &transport, &request, |update| printer.show(update)).await
        }
        Command::Replay { file, chunk_size } => {
            let body = std::fs::read(&file).with_context(|| format!("Failed to read {}", file))?;
            let transport = ReplayTransport::split(body, chunk_size);
            info!(chunks = transport.chunks().len(), "Replaying captured stream");

            let request = ChatRequest::new("replay", Vec::new());
            print_stream(StreamSession::new(), &transport, &request, |update| {
                writeln!(
                    io::stdout().lock(),
                    "content={:?} complete={} error={:?}",
                    update.content, update.complete, update.error
                )
            })
            .await
        }
    }
}

/// Run the session, writing each update with `show`
///
/// A failed write (e.g. a closed pipe) cancels the session and is reported
/// after it stops.
async fn print_stream<T, F>(
    session: StreamSession,
    transport: &T,
    request: &ChatRequest,
    mut show: F,
) -> anyhow::Result<()>
where
    T: Transport,
    F: FnMut(&StreamUpdate) -> io::Result<()>,
{
    let stop = session.cancel_handle();
    let mut write_error = None;

    let outcome = session
        .send(transport, request, |update| {
            if write_error.is_none()
                && let Err(e) = show(&update)
            {
                stop.cancel();
                write_error = Some(e);
            }
        })
        .await;

    if let Some(e) = write_error {
        return Err(e).context("Failed to write to stdout");
    }
    finish(outcome)
}

fn finish(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Failed(message) => bail!(message),
        other => {
            info!(?other, "Done");
            Ok(())
        }
    }
}

/// Prints the growing answer, writing only what each full-content update adds
#[derive(Default)]
struct AnswerPrinter {
    shown: String,
}

impl AnswerPrinter {
    fn show(&mut self, update: &StreamUpdate) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if update.complete {
            return writeln!(out);
        }

        match update.content.strip_prefix(self.shown.as_str()) {
            Some(added) => write!(out, "{}", added)?,
            // backend rewrote earlier text, start over on a new line
            None => write!(out, "\n{}", update.content)?,
        }
        out.flush()?;
        self.shown.clone_from(&update.content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = concat!(
        "data: {\"code\":0,\"data\":{\"answer\":\"He\"}}\n\n",
        "data: {\"code\":0,\"data\":{\"answer\":\"Hello\"}}\n\n",
        "data: {\"code\":0,\"data\":true}\n\n",
    );

    #[tokio::test]
    async fn test_write_error_stops_stream() {
        let transport = ReplayTransport::from_chunks([BODY]);
        let request = ChatRequest::new("conv-1", Vec::new());
        let mut calls = 0;

        let result = print_stream(StreamSession::new(), &transport, &request, |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Failed to write to stdout");
        assert_eq!(
            err.downcast_ref::<io::Error>().map(io::Error::kind),
            Some(io::ErrorKind::BrokenPipe)
        );
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_successful_writes_follow_outcome() {
        let transport = ReplayTransport::from_chunks([BODY]);
        let request = ChatRequest::new("conv-1", Vec::new());
        let mut seen = Vec::new();

        let result = print_stream(StreamSession::new(), &transport, &request, |update| {
            seen.push(update.clone());
            Ok(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(seen.len(), 3);
        assert!(seen[2].complete);
    }
}
