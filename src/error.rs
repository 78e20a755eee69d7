//! # Error Model
//!
//! LarkDB surfaces failures through `eyre::Result` like the rest of the
//! crate, but callers need to branch on *what kind* of failure occurred
//! (builder misuse vs. constraint violation vs. store failure). The typed
//! layer is `DbError`, a small thiserror enum carried inside the
//! `eyre::Report`; `ErrorCode::of` recovers the code from any report.
//!
//! ## Error Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | NotFound | service, table, or row missing |
//! | Syntax | builder misuse (missing/doubled clause, unknown column) |
//! | Constraint | unique/primary-key, foreign-key, or nullability violation |
//! | Type | value does not match the declared column type |
//! | Scope | transaction used outside its table scope or after completion |
//! | Store | backing-store adapter reported failure |
//! | Cancelled | transaction cancelled before commit |
//! | Unknown | invariant breach |
//!
//! `Syntax` errors are raised at builder call time and are never recoverable
//! by retry. `Cancelled` is the only non-error non-success outcome. Retries
//! are never automatic.

use eyre::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    Syntax,
    Constraint,
    Type,
    Scope,
    Store,
    Cancelled,
    Unknown,
}

impl ErrorCode {
    /// Recovers the error code from a report, defaulting to `Unknown` for
    /// errors that did not originate from a `DbError`.
    pub fn of(report: &Report) -> ErrorCode {
        report
            .downcast_ref::<DbError>()
            .map(|e| e.code)
            .unwrap_or(ErrorCode::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Syntax => "SYNTAX",
            ErrorCode::Constraint => "CONSTRAINT",
            ErrorCode::Type => "TYPE",
            ErrorCode::Scope => "SCOPE",
            ErrorCode::Store => "STORE",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DbError {
    pub code: ErrorCode,
    pub message: String,
}

impl DbError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Builds an `eyre::Report` carrying a typed error code.
pub fn db_error(code: ErrorCode, message: impl Into<String>) -> Report {
    Report::new(DbError::new(code, message))
}

macro_rules! code_ctor {
    ($name:ident, $code:ident) => {
        pub fn $name(message: impl Into<String>) -> Report {
            db_error(ErrorCode::$code, message)
        }
    };
}

code_ctor!(not_found, NotFound);
code_ctor!(syntax, Syntax);
code_ctor!(constraint, Constraint);
code_ctor!(type_mismatch, Type);
code_ctor!(scope, Scope);
code_ctor!(store_failure, Store);
code_ctor!(cancelled, Cancelled);
code_ctor!(unknown, Unknown);
