//! One pipeline run: scan → parse → resolve → interpret.
//!
//! A stage that produced any diagnostic stops the run before the next stage
//! starts.  The [`Interpreter`] lives as long as the [`Session`], so globals
//! defined by one run are visible to the next (the REPL relies on this).

use log::{debug, info};

use crate::error::PseudoError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Lexical, syntax or resolution errors; nothing was executed.
    StaticError,
    RuntimeError,
}

impl Status {
    /// Process exit code for a file run.
    pub const fn exit_code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::StaticError => 65,
            Status::RuntimeError => 70,
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub status: Status,
    pub diagnostics: Vec<PseudoError>,
}

impl Report {
    fn new(status: Status, diagnostics: Vec<PseudoError>) -> Self {
        Report {
            status,
            diagnostics,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Session { interpreter }
    }

    pub fn run(&mut self, source: &str, path: &str) -> Report {
        info!("Running {} ({} bytes)", path, source.len());

        let (tokens, errors) = Scanner::new(source, path).scan_tokens();
        if !errors.is_empty() {
            return Report::new(Status::StaticError, errors);
        }

        let (statements, errors) = Parser::new(tokens).parse();
        if !errors.is_empty() {
            return Report::new(Status::StaticError, errors);
        }

        let (locals, errors) = Resolver::new().resolve(&statements);
        if !errors.is_empty() {
            return Report::new(Status::StaticError, errors);
        }

        debug!("Static stages passed for {}", path);
        self.interpreter.resolve_locals(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => Report::new(Status::Success, Vec::new()),
            Err(e) => Report::new(Status::RuntimeError, vec![e]),
        }
    }
}
