use crate::config::Limits;
use crate::kv::KvError;
use crate::reader::ReaderError;
use crate::stats::StatsError;
use crate::table::TableError;
use serde::Serialize;
use std::io::{BufRead, Write};
use thiserror::Error;

/// Unified failure taxonomy for one dispatched command.
///
/// Every variant aborts only the command that raised it; the surrounding
/// loop reports it and continues with the next input line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Kv(#[from] KvError),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("{command} expects {expected} arguments, got {got}")]
    BadArity {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,
}

/// Checks a token list against an exact arity before dispatching.
pub fn expect_arity(command: &str, tokens: &[&str], expected: usize) -> Result<(), CommandError> {
    // tokens includes the command itself
    let got = tokens.len().saturating_sub(1);
    if got != expected {
        return Err(CommandError::BadArity {
            command: command.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// One line-oriented command frontend driven by `run_lines`.
pub trait LineInterpreter {
    /// Evaluates one non-empty input line. `Ok(Some(text))` is written to
    /// the output stream; `Ok(None)` means the command succeeded silently.
    fn eval_line(&mut self, line: &str) -> Result<Option<String>, CommandError>;

    /// Called once at end of input for frontends that aggregate over the
    /// whole run (record ingesters). Returned lines are written to output.
    fn finish(&mut self) -> Result<Vec<String>, CommandError> {
        Ok(Vec::new())
    }
}

/// Outcome counts for one interpreter run.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Non-empty input units seen.
    pub lines: u64,
    /// Units that dispatched without error.
    pub ok: u64,
    /// Units (or the final aggregate) that failed recoverably.
    pub errors: u64,
}

/// Drives an interpreter over a byte stream, one line at a time.
///
/// Input is consumed as raw bytes and converted lossily, so arbitrary
/// (fuzzer-shaped) input is tolerated. Lines longer than the configured
/// maximum are rejected with `LengthOverflow` but the run continues, as does
/// every other per-line failure; only I/O errors on the streams abort.
pub fn run_lines<R: BufRead, W: Write, E: Write>(
    mut input: R,
    interpreter: &mut dyn LineInterpreter,
    out: &mut W,
    err: &mut E,
    limits: &Limits,
) -> std::io::Result<RunSummary> {
    let mut summary = RunSummary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;

        if buf.len() > limits.max_line_len {
            summary.errors += 1;
            let overflow = ReaderError::LengthOverflow {
                requested: buf.len() as i64,
                max: limits.max_line_len,
            };
            writeln!(err, "ERROR: {overflow}")?;
            continue;
        }

        match interpreter.eval_line(line) {
            Ok(Some(text)) => {
                summary.ok += 1;
                writeln!(out, "{text}")?;
            }
            Ok(None) => summary.ok += 1,
            Err(e) => {
                summary.errors += 1;
                writeln!(err, "ERROR: {e}")?;
            }
        }
    }

    match interpreter.finish() {
        Ok(tail) => {
            for text in tail {
                writeln!(out, "{text}")?;
            }
        }
        Err(e) => {
            summary.errors += 1;
            writeln!(err, "ERROR: {e}")?;
        }
    }

    Ok(summary)
}
