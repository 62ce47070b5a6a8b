//! Error taxonomy shared by every syncdb crate.

use std::fmt;

use thiserror::Error;

/// Dense, contiguous error code enum. Reverse lookup by name is provided via
/// [`ErrorCode::from_name`] / [`ErrorCode::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Ok = 0,
    RuntimeError = 1,
    LogicError = 2,
    LimitExceeded = 3,
    InvalidArgument = 4,
    InvalidQueryName = 5,
    SyntaxError = 6,
    TypeMismatch = 7,
    UnknownError = 8,
    BrokenPromise = 9,
    BadChangeset = 10,
    BadProgress = 11,
}

const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::Ok,
    ErrorCode::RuntimeError,
    ErrorCode::LogicError,
    ErrorCode::LimitExceeded,
    ErrorCode::InvalidArgument,
    ErrorCode::InvalidQueryName,
    ErrorCode::SyntaxError,
    ErrorCode::TypeMismatch,
    ErrorCode::UnknownError,
    ErrorCode::BrokenPromise,
    ErrorCode::BadChangeset,
    ErrorCode::BadProgress,
];

impl ErrorCode {
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Ok => "OK",
            ErrorCode::RuntimeError => "RuntimeError",
            ErrorCode::LogicError => "LogicError",
            ErrorCode::LimitExceeded => "LimitExceeded",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::InvalidQueryName => "InvalidQueryName",
            ErrorCode::SyntaxError => "SyntaxError",
            ErrorCode::TypeMismatch => "TypeMismatch",
            ErrorCode::UnknownError => "UnknownError",
            ErrorCode::BrokenPromise => "BrokenPromise",
            ErrorCode::BadChangeset => "BadChangeset",
            ErrorCode::BadProgress => "BadProgress",
        }
    }

    pub fn from_name(name: &str) -> Option<ErrorCode> {
        ALL_CODES.iter().copied().find(|c| c.name() == name)
    }

    pub fn is_ok(self) -> bool {
        matches!(self, ErrorCode::Ok)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A code plus a human-readable reason. The universal success token is
/// `Status::ok()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: ErrorCode,
    pub reason: String,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: ErrorCode::Ok,
            reason: String::new(),
        }
    }

    pub fn with_code(code: ErrorCode, reason: impl Into<String>) -> Self {
        Status {
            code,
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.reason)
        }
    }
}

impl std::error::Error for Status {}

/// Top-level error type for `syncdb-core`. Every other crate's error enum
/// carries a `#[from] syncdb_core::Error` arm.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error("mutex poisoned: {0}")]
    Poisoned(String),
}

/// Newtype so `Status` (a plain data value) can also be raised via `?`
/// without requiring every caller to match on `ErrorCode::Ok`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StatusError(pub Status);

impl From<Status> for StatusError {
    fn from(s: Status) -> Self {
        StatusError(s)
    }
}

impl Error {
    pub fn status(code: ErrorCode, reason: impl Into<String>) -> Self {
        Error::Status(StatusError(Status::with_code(code, reason)))
    }

    pub fn as_status(&self) -> Status {
        match self {
            Error::Status(StatusError(s)) => s.clone(),
            Error::Assertion(msg) => Status::with_code(ErrorCode::LogicError, msg.clone()),
            Error::Poisoned(msg) => Status::with_code(ErrorCode::RuntimeError, msg.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_name_roundtrip() {
        for code in ALL_CODES {
            assert_eq!(ErrorCode::from_name(code.name()), Some(*code));
        }
    }

    #[test]
    fn status_ok_is_ok() {
        assert!(Status::ok().is_ok());
        assert!(!Status::with_code(ErrorCode::BadProgress, "x").is_ok());
    }

    #[test]
    fn status_display_includes_reason() {
        let s = Status::with_code(ErrorCode::SyntaxError, "unexpected token");
        assert_eq!(s.to_string(), "SyntaxError: unexpected token");
    }
}
