//! Errors - use case のエラー分類
//!
//! 業務関数は `UsecaseError { kind, message }` を返し、
//! 呼び出し側（bot / worker）は kind だけを見て応答を決める。

use std::fmt;

/// Failure category of a business operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    AlreadyExists,
    /// Store or broker failure. Callers show a generic "try again later".
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

pub const MSG_DATABASE_ERROR: &str = "operation failed, database error";
pub const MSG_INTERNAL_ERROR: &str = "internal error";
pub const MSG_NOT_FOUND: &str = "not found";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct UsecaseError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UsecaseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn database() -> Self {
        Self::new(ErrorKind::Internal, MSG_DATABASE_ERROR)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal, MSG_INTERNAL_ERROR)
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
