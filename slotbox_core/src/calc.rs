use crate::config::Limits;
use crate::reader::{self, ReaderError};
use crate::session::{CommandError, LineInterpreter, expect_arity};

/// Toy calculator/allocator frontend.
///
/// `CALC a op b` evaluates with checked arithmetic, `ALLOC size payload`
/// validates a declared size against the actual payload, `ECHO` repeats its
/// arguments.
#[derive(Debug)]
pub struct CalcInterpreter {
    max_payload_len: usize,
}

impl CalcInterpreter {
    pub fn new(limits: &Limits) -> Self {
        Self {
            max_payload_len: limits.max_slot_len,
        }
    }

    fn calc(a: i64, op: &str, b: i64) -> Result<i64, CommandError> {
        let result = match op {
            "+" => a.checked_add(b),
            "-" => a.checked_sub(b),
            "*" => a.checked_mul(b),
            "/" => {
                if b == 0 {
                    return Err(CommandError::DivisionByZero);
                }
                a.checked_div(b)
            }
            _ => return Err(CommandError::BadArgument(format!("unknown operator {op:?}"))),
        };
        result.ok_or(CommandError::Overflow)
    }

    /// Takes `size` bytes from `payload`, failing with `TruncatedInput` when
    /// the declared size exceeds what is actually present.
    fn alloc(&self, size: i64, payload: &str) -> Result<String, CommandError> {
        let size = reader::checked_len(size, self.max_payload_len)?;
        let bytes = payload.as_bytes();
        if bytes.len() < size {
            return Err(CommandError::Reader(ReaderError::TruncatedInput {
                needed: size,
                available: bytes.len(),
            }));
        }
        let taken = String::from_utf8_lossy(&bytes[..size]);
        Ok(format!("Data read: {taken}"))
    }
}

impl LineInterpreter for CalcInterpreter {
    fn eval_line(&mut self, line: &str) -> Result<Option<String>, CommandError> {
        let tokens = reader::tokenize(line);
        let Some(&command) = tokens.first() else {
            return Ok(None);
        };

        match command {
            "CALC" => {
                expect_arity(command, &tokens, 3)?;
                let a = reader::parse_i64(tokens[1])?;
                let b = reader::parse_i64(tokens[3])?;
                let result = Self::calc(a, tokens[2], b)?;
                Ok(Some(format!("Result: {result}")))
            }
            "ALLOC" => {
                if tokens.len() < 2 {
                    return Err(CommandError::BadArity {
                        command: command.to_string(),
                        expected: 1,
                        got: 0,
                    });
                }
                let size = reader::parse_i64(tokens[1])?;
                // Payload is the raw remainder of the line after the size
                // token and one separator, spaces included.
                let after_cmd = line.trim_start()[command.len()..].trim_start();
                let after_size = &after_cmd[tokens[1].len()..];
                let payload = after_size
                    .strip_prefix(|c: char| c.is_whitespace())
                    .unwrap_or(after_size);
                Ok(Some(self.alloc(size, payload)?))
            }
            "ECHO" => Ok(Some(tokens[1..].join(" "))),
            _ => Err(CommandError::UnknownCommand(command.to_string())),
        }
    }
}
