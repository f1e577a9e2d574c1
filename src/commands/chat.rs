//! Interactive conversation loop for `parley chat`.

use crate::Result;
use crate::llm::CompletionClient;
use crate::orchestrator::{OutcomeKind, Orchestrator, TurnOutcome};
use crate::session::{GREETING, Session};
use std::io::{BufRead, Write};

const PROMPT: &str = "you> ";

const INVALID_INPUT_NOTICE: &str = "That line was not valid UTF-8, so it was skipped.";

const HELP: &str = "Commands:
  /clear  Forget this conversation and start over
  /help   Show this help
  /quit   Exit (Ctrl-D works too)";

/// Run the conversation loop until `/quit` or end of input.
///
/// A line that is not valid UTF-8 is skipped with a notice; the conversation
/// carries on.
pub fn run<C, R, W>(orchestrator: &mut Orchestrator<C>, mut input: R, out: &mut W) -> Result<()>
where
    C: CompletionClient,
    R: BufRead,
    W: Write,
{
    let mut session = Session::with_greeting(GREETING);
    print_assistant(out, GREETING)?;

    let mut buf = Vec::new();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            writeln!(out)?;
            break;
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            tracing::warn!(bytes = buf.len(), "skipped input line that is not UTF-8");
            writeln!(out, "{}", INVALID_INPUT_NOTICE)?;
            continue;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => writeln!(out, "{}", HELP)?,
            "/clear" => {
                session.clear();
                writeln!(out, "Conversation cleared.")?;
                print_assistant(out, GREETING)?;
            }
            message => {
                let outcome = orchestrator.run_turn(&mut session, message);
                print_outcome(out, &outcome)?;
            }
        }
    }

    tracing::debug!(turns = session.len(), "chat ended");
    Ok(())
}

fn print_assistant<W: Write>(out: &mut W, text: &str) -> Result<()> {
    writeln!(out, "assistant> {}", text)?;
    Ok(())
}

fn print_outcome<W: Write>(out: &mut W, outcome: &TurnOutcome) -> Result<()> {
    match (&outcome.kind, &outcome.tool) {
        (OutcomeKind::Tool, Some(tool)) => writeln!(out, "assistant> [{}] {}", tool, outcome.text)?,
        _ => print_assistant(out, &outcome.text)?,
    }
    Ok(())
}
