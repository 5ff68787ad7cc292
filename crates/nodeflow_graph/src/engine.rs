// SPDX-License-Identifier: MIT OR Apache-2.0
//! External execution engine boundary.
//!
//! The graph hands over plain command text, one command at a time. Results
//! live on the engine side under their `_<hash>` identifiers.

use crate::node::NodeId;
use std::io::Write;

/// Executes textual commands
pub trait CommandEngine {
    /// Run one command
    fn run_command(&mut self, command: &str) -> Result<(), EngineError>;

    /// Run a query and return its value
    fn eval_command(&mut self, command: &str) -> Result<String, EngineError> {
        Err(EngineError::Unsupported(command.to_string()))
    }
}

/// Error reported by an engine for one command
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Engine refused the command
    #[error("Command rejected: {reason}")]
    Rejected {
        /// Command text
        command: String,
        /// Engine's reason
        reason: String,
    },

    /// Writing the command failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine cannot answer queries
    #[error("Query not supported: {0}")]
    Unsupported(String),
}

/// A command the engine refused during evaluation
#[derive(Debug)]
pub struct DispatchFailure {
    /// Node that produced the command
    pub node: NodeId,
    /// Command text
    pub command: String,
    /// Engine error
    pub error: EngineError,
}

/// Keeps every accepted command in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingEngine {
    commands: Vec<String>,
    fail_on: Vec<String>,
    answers: Vec<(String, String)>,
}

impl RecordingEngine {
    /// Create an engine that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any command containing `pattern`
    pub fn with_failure(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on.push(pattern.into());
        self
    }

    /// Answer `query` with `value` from `eval_command`
    pub fn with_answer(mut self, query: impl Into<String>, value: impl Into<String>) -> Self {
        self.answers.push((query.into(), value.into()));
        self
    }

    /// Accepted commands in arrival order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Take the accepted commands, leaving the log empty
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.commands)
    }
}

impl CommandEngine for RecordingEngine {
    fn run_command(&mut self, command: &str) -> Result<(), EngineError> {
        if let Some(pattern) = self.fail_on.iter().find(|p| command.contains(p.as_str())) {
            return Err(EngineError::Rejected {
                command: command.to_string(),
                reason: format!("matched '{pattern}'"),
            });
        }
        self.commands.push(command.to_string());
        Ok(())
    }

    fn eval_command(&mut self, command: &str) -> Result<String, EngineError> {
        self.answers
            .iter()
            .find(|(query, _)| query == command)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| EngineError::Unsupported(command.to_string()))
    }
}

/// Writes each command as one line, e.g. to stdout or a script file.
///
/// Every command is flushed before it counts as accepted, so a failing
/// write is reported against the command that hit it.
#[derive(Debug)]
pub struct ScriptEngine<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> ScriptEngine<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of commands written
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the writer
    pub fn into_inner(mut self) -> Result<W, EngineError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> CommandEngine for ScriptEngine<W> {
    fn run_command(&mut self, command: &str) -> Result<(), EngineError> {
        writeln!(self.writer, "{command}")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_engine() {
        let mut engine = RecordingEngine::new()
            .with_failure("Drop")
            .with_answer("TableInfo(_a, 8)", "12");
        engine.run_command("Select * From _a Into _b").unwrap();
        assert!(engine.run_command("Drop Table _a").is_err());
        assert_eq!(engine.commands(), ["Select * From _a Into _b"]);
        assert_eq!(engine.eval_command("TableInfo(_a, 8)").unwrap(), "12");
        assert!(matches!(
            engine.eval_command("TableInfo(_b, 8)"),
            Err(EngineError::Unsupported(_))
        ));
        assert_eq!(engine.take().len(), 1);
        assert!(engine.commands().is_empty());
    }

    #[test]
    fn test_script_engine_writes_lines() {
        let mut engine = ScriptEngine::new(Vec::new());
        engine.run_command("Browse * From _a").unwrap();
        engine.run_command("Map From _a").unwrap();
        assert_eq!(engine.written(), 2);
        assert!(engine.eval_command("x").is_err());
        let out = String::from_utf8(engine.into_inner().unwrap()).unwrap();
        assert_eq!(out, "Browse * From _a\nMap From _a\n");
    }

    /// Accepts nothing, like a full disk
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_buffered_write_failure_is_reported_per_command() {
        let mut engine = ScriptEngine::new(std::io::BufWriter::new(FullDisk));
        assert!(matches!(
            engine.run_command("Browse * From _a"),
            Err(EngineError::Io(_))
        ));
        assert!(engine.run_command("Map From _a").is_err());
        assert_eq!(engine.written(), 0);
    }
}
