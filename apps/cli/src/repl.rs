//! Interactive session
//!
//! Reads command lines from stdin until end of input. Errors are reported
//! and the session continues with the next line.

use physcalc_engine::{Environment, Error};
use std::io::{self, BufRead, IsTerminal, Write};

const PROMPT: &str = "> ";
/// Shown while a function declaration is still open.
const CONTINUATION_PROMPT: &str = "... ";

pub fn run(env: &mut Environment) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut lines = stdin.lock().lines();
    let mut failures = 0usize;

    loop {
        if interactive {
            let prompt = if env.declaration_pending() {
                CONTINUATION_PROMPT
            } else {
                PROMPT
            };
            print!("{prompt}");
            io::stdout().flush()?;
        }

        let Some(line) = lines.next() else { break };
        let line = line?;
        if let Err(e) = env.execute(&line) {
            failures += 1;
            tracing::debug!(error = ?e, line = %line, "command failed");
            eprintln!("{}", describe(&e));
        }
    }

    if let Some(name) = env.cancel_declaration() {
        eprintln!("error: declaration of '{name}' was never closed");
    }
    tracing::debug!(failures, "session ended");
    Ok(())
}

/// Error text for the user, including the partial value of an unterminated
/// expression.
pub fn describe(error: &Error) -> String {
    match error {
        Error::Unterminated {
            partial: Some(partial),
            ..
        } => format!("error: {error} (value so far: {partial})"),
        _ => format!("error: {error}"),
    }
}
