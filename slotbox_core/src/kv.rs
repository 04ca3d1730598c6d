use crate::config::Limits;
use crate::session::{CommandError, LineInterpreter};
use crate::stats::Aggregate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KvError {
    /// A `SET`/`CONFIG` argument without `=`, or with an empty key or value.
    #[error("malformed pair {0:?}, expected KEY=VALUE")]
    MalformedPair(String),

    /// `REMOVE` of a key that is not present.
    #[error("key {0:?} not present")]
    KeyNotFound(String),
}

/// Insertion-ordered key/value store.
///
/// A vector of pairs, not a map: `DUMP` must reproduce insertion order, and
/// the store is small enough that linear lookup is the simplest correct
/// structure.
#[derive(Debug, Default)]
pub struct KvStore {
    pairs: Vec<(String, String)>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Adds the pair, replacing the value if the key already exists.
    pub fn set(&mut self, key: &str, value: &str) {
        for pair in &mut self.pairs {
            if pair.0 == key {
                pair.1 = value.to_string();
                return;
            }
        }
        self.pairs.push((key.to_string(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Result<(), KvError> {
        let position = self.pairs.iter().position(|(k, _)| k == key);
        match position {
            Some(i) => {
                self.pairs.remove(i);
                Ok(())
            }
            None => Err(KvError::KeyNotFound(key.to_string())),
        }
    }

    /// Mean byte length of stored values.
    pub fn average_value_len(&self) -> Result<i64, CommandError> {
        let mut agg = Aggregate::new();
        for (_, value) in &self.pairs {
            agg.push(value.len() as i64);
        }
        Ok(agg.mean()?)
    }

    pub fn dump(&self) -> String {
        let lines: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        lines.join("\n")
    }
}

fn split_pair(raw: &str) -> Result<(&str, &str), KvError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(KvError::MalformedPair(raw.to_string()));
    };
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return Err(KvError::MalformedPair(raw.to_string()));
    }
    Ok((key, value))
}

/// Line frontend over `KvStore`: `SET K=V`, `CONFIG K=V`, `REMOVE K`,
/// `COMPUTE`, `DUMP`.
#[derive(Debug, Default)]
pub struct KvInterpreter {
    store: KvStore,
}

impl KvInterpreter {
    pub fn new(_limits: &Limits) -> Self {
        Self {
            store: KvStore::new(),
        }
    }
}

impl LineInterpreter for KvInterpreter {
    fn eval_line(&mut self, line: &str) -> Result<Option<String>, CommandError> {
        let Some((command, rest)) = split_command(line) else {
            return Ok(None);
        };

        match command {
            "SET" | "CONFIG" => {
                let (key, value) = split_pair(rest.trim())?;
                self.store.set(key, value);
                Ok(None)
            }
            "REMOVE" => {
                let key = rest.trim();
                if key.is_empty() {
                    return Err(CommandError::BadArity {
                        command: command.to_string(),
                        expected: 1,
                        got: 0,
                    });
                }
                self.store.remove(key)?;
                Ok(None)
            }
            "COMPUTE" => {
                expect_no_args(command, rest)?;
                let mean = self.store.average_value_len()?;
                Ok(Some(format!("Average length: {mean}")))
            }
            "DUMP" => {
                expect_no_args(command, rest)?;
                if self.store.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(self.store.dump()))
                }
            }
            _ => Err(CommandError::UnknownCommand(command.to_string())),
        }
    }
}

fn expect_no_args(command: &str, rest: &str) -> Result<(), CommandError> {
    let extra = rest.split_whitespace().count();
    if extra != 0 {
        return Err(CommandError::BadArity {
            command: command.to_string(),
            expected: 0,
            got: extra,
        });
    }
    Ok(())
}

/// Splits a line into its command word and the raw remainder.
fn split_command(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => Some((command, rest)),
        None => Some((trimmed, "")),
    }
}
