//! Line-oriented chat surface.

use super::errors::AgentError;
use super::models::{InputAction, SessionEvent, classify_input};
use super::runner::Session;
use crate::model::ModelProvider;
use serde_json::Value;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Reads user lines from `input` until a quit token or end of input.
pub async fn run_console<P, R, W>(
    session: &mut Session<P>,
    input: R,
    out: &mut W,
) -> Result<(), AgentError>
where
    P: ModelProvider,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "\nConnected! Found {} tools:", session.tools().len())?;
    for tool in session.tools() {
        writeln!(out, "  - {}", tool.name)?;
    }
    writeln!(out, "\n=== AI Filesystem Assistant ===")?;
    writeln!(out, "Type 'quit' to exit\n")?;

    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out, "\nGoodbye!")?;
            return Ok(());
        };
        let text = match classify_input(&line) {
            InputAction::Skip => continue,
            InputAction::Quit => {
                writeln!(out, "Goodbye!")?;
                return Ok(());
            }
            InputAction::Submit(text) => text,
        };

        let mut io_result = Ok(());
        let outcome = session
            .submit(text, &mut |event| {
                if let SessionEvent::ToolStarted(call) = event {
                    let arguments = Value::Object(call.arguments.clone());
                    if io_result.is_ok() {
                        io_result = writeln!(out, "\n[Executing: {}({arguments})]", call.name);
                    }
                }
            })
            .await?;
        io_result?;

        writeln!(
            out,
            "\nAssistant: {}\n",
            outcome.response.as_deref().unwrap_or_default()
        )?;
    }
}
