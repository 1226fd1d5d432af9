//! Centralised error hierarchy for the **pseudocode interpreter**.
//!
//! Every stage (scanner, parser, resolver, runtime) reports its failures as
//! one of the variants defined here, so a whole pipeline run can collect its
//! diagnostics into a single `Vec<PseudoError>`.
//!
//! The `Display` output of the four diagnostic variants is the user-facing
//! report format:
//!
//! ```text
//! File: <path>, Line: <line>, Where: <lexeme>, Message: <text>.
//! ```
//!
//! Lexical errors have no token and therefore omit the `Where` field.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::Token;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PseudoError {
    /// Lexical (scanner) error with source location.
    #[error("File: {path}, Line: {line}, Message: {message}.")]
    Scan {
        /// Path of the source the scanner was reading.
        path: String,

        /// 1‑based line where the error occurred.
        line: usize,

        /// Human‑readable description.
        message: String,
    },

    /// Syntactic (parser) error reported at a token.
    #[error("File: {path}, Line: {line}, Where: {lexeme}, Message: {message}.")]
    Parse {
        path: String,
        line: usize,
        lexeme: String,
        message: String,
    },

    /// Static‑analysis failure (illegal `THIS`, `SUPER`, `RETURN`, redeclaration…).
    #[error("File: {path}, Line: {line}, Where: {lexeme}, Message: {message}.")]
    Resolve {
        path: String,
        line: usize,
        lexeme: String,
        message: String,
    },

    /// Runtime evaluation error, located at the offending token.
    #[error("File: {path}, Line: {line}, Where: {lexeme}, Message: {message}.")]
    Runtime {
        path: String,
        line: usize,
        lexeme: String,
        message: String,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PseudoError {
    /// Helper constructor for the **scanner**.
    pub fn scan<P: Into<String>, S: Into<String>>(path: P, line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Scan error: line={}, msg={}", line, message);

        PseudoError::Scan {
            path: path.into(),
            line,
            message,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        PseudoError::Parse {
            path: token.path.to_string(),
            line: token.line,
            lexeme: token.lexeme.clone(),
            message,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        PseudoError::Resolve {
            path: token.path.to_string(),
            line: token.line,
            lexeme: token.lexeme.clone(),
            message,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        PseudoError::Runtime {
            path: token.path.to_string(),
            line: token.line,
            lexeme: token.lexeme.clone(),
            message,
        }
    }

    /// Message text without the location prefix.
    pub fn message(&self) -> String {
        match self {
            PseudoError::Scan { message, .. }
            | PseudoError::Parse { message, .. }
            | PseudoError::Resolve { message, .. }
            | PseudoError::Runtime { message, .. } => message.clone(),
            PseudoError::Io(e) => e.to_string(),
        }
    }

    /// Line the diagnostic points at, if it has a source location.
    pub fn line(&self) -> Option<usize> {
        match self {
            PseudoError::Scan { line, .. }
            | PseudoError::Parse { line, .. }
            | PseudoError::Resolve { line, .. }
            | PseudoError::Runtime { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, PseudoError>;
