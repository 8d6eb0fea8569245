//! Interactive console
//!
//! Line-oriented producer for the work queue: every non-empty line becomes a
//! prompt. `status` prints the queue snapshot and `quit` ends the session.

use crate::error::ApiError;
use crate::queue::{PageQueue, QueueStatus};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Quit,
    Status,
    Empty,
    Prompt(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            ConsoleCommand::Empty
        } else if trimmed.eq_ignore_ascii_case("quit") {
            ConsoleCommand::Quit
        } else if trimmed.eq_ignore_ascii_case("status") {
            ConsoleCommand::Status
        } else {
            ConsoleCommand::Prompt(trimmed.to_string())
        }
    }
}

/// `> [Processing] [Queue: n] ` style input marker
pub fn prompt_marker(status: QueueStatus, color: bool) -> String {
    let mut marker = String::from(">");
    if status.is_processing {
        if color {
            marker.push_str(&format!(" {}", "[Processing]".yellow()));
        } else {
            marker.push_str(" [Processing]");
        }
    }
    if status.queue_depth > 0 {
        let depth = format!("[Queue: {}]", status.queue_depth);
        if color {
            marker.push_str(&format!(" {}", depth.cyan()));
        } else {
            marker.push(' ');
            marker.push_str(&depth);
        }
    }
    marker.push(' ');
    marker
}

pub fn format_status(status: QueueStatus) -> String {
    format!(
        "Queue status:\nItems in queue: {}\nCurrently processing: {}\n",
        status.queue_depth,
        if status.is_processing { "Yes" } else { "No" }
    )
}

pub struct Console {
    queue: PageQueue,
    frontend_url: String,
    color: bool,
}

impl Console {
    pub fn new(queue: PageQueue, frontend_url: impl Into<String>, color: bool) -> Self {
        Self {
            queue,
            frontend_url: frontend_url.into(),
            color,
        }
    }

    /// Read commands until `quit` or end of input
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<(), ApiError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let banner = format!(
            "\nWeb app is running. Access it at {}\n\nEnter your page descriptions below. Type 'quit' to exit.\nType 'status' to see the queue status.\n",
            self.frontend_url
        );
        write_out(&mut output, &banner).await?;

        let mut lines = input.lines();
        loop {
            let marker = prompt_marker(self.queue.status(), self.color);
            write_out(&mut output, &format!("\n{}", marker)).await?;

            let Some(line) = lines.next_line().await.map_err(console_io)? else {
                debug!("Console input closed");
                write_out(&mut output, "\nExiting...\n").await?;
                return Ok(());
            };

            match ConsoleCommand::parse(&line) {
                ConsoleCommand::Quit => {
                    write_out(&mut output, "\nShutting down...\n").await?;
                    return Ok(());
                }
                ConsoleCommand::Status => {
                    let text = format!("\n{}", format_status(self.queue.status()));
                    write_out(&mut output, &text).await?;
                }
                ConsoleCommand::Empty => {
                    write_out(&mut output, "Please provide a valid prompt.\n").await?;
                }
                ConsoleCommand::Prompt(prompt) => {
                    let position = self.queue.enqueue(prompt);
                    write_out(
                        &mut output,
                        &format!("Prompt added to queue. Position: {}\n", position),
                    )
                    .await?;
                }
            }
        }
    }
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), ApiError> {
    output.write_all(text.as_bytes()).await.map_err(console_io)?;
    output.flush().await.map_err(console_io)
}

fn console_io(e: std::io::Error) -> ApiError {
    ApiError::ConfigError(format!("Console I/O failed: {}", e))
}
