//! `Expected<T>`: value-or-status sum type with monadic combinators (C1).

use std::any::Any;
use std::panic::{catch_unwind, UnwindSafe};

use crate::error::{ErrorCode, Status};

/// Either a value or a failure [`Status`]. Equality compares both the code
/// and, for the success arm, the value.
#[derive(Debug, Clone)]
pub enum Expected<T> {
    Ok(T),
    Err(Status),
}

impl<T> Expected<T> {
    pub fn from_value(value: T) -> Self {
        Expected::Ok(value)
    }

    pub fn from_status(status: Status) -> Self {
        debug_assert!(!status.is_ok(), "Expected::from_status requires a failure");
        Expected::Err(status)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Expected::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    pub fn status(&self) -> Status {
        match self {
            Expected::Ok(_) => Status::ok(),
            Expected::Err(s) => s.clone(),
        }
    }

    pub fn and_then<U, F>(self, f: F) -> Expected<U>
    where
        F: FnOnce(T) -> Expected<U>,
    {
        match self {
            Expected::Ok(v) => f(v),
            Expected::Err(s) => Expected::Err(s),
        }
    }

    pub fn map<U, F>(self, f: F) -> Expected<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Expected::Ok(v) => Expected::Ok(f(v)),
            Expected::Err(s) => Expected::Err(s),
        }
    }

    pub fn or_else<F>(self, f: F) -> Expected<T>
    where
        F: FnOnce(Status) -> Expected<T>,
    {
        match self {
            Expected::Ok(v) => Expected::Ok(v),
            Expected::Err(s) => f(s),
        }
    }

    pub fn map_error<F>(self, f: F) -> Expected<T>
    where
        F: FnOnce(Status) -> Status,
    {
        match self {
            Expected::Ok(v) => Expected::Ok(v),
            Expected::Err(s) => Expected::Err(f(s)),
        }
    }

    pub fn into_result(self) -> Result<T, Status> {
        match self {
            Expected::Ok(v) => Ok(v),
            Expected::Err(s) => Err(s),
        }
    }

    pub fn unwrap(self) -> T {
        match self {
            Expected::Ok(v) => v,
            Expected::Err(s) => panic!("called `Expected::unwrap()` on an error status: {s}"),
        }
    }
}

impl<T: PartialEq> PartialEq for Expected<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expected::Ok(a), Expected::Ok(b)) => a == b,
            (Expected::Err(a), Expected::Err(b)) => a.code == b.code,
            _ => false,
        }
    }
}

impl<T> From<T> for Expected<T> {
    fn from(value: T) -> Self {
        Expected::Ok(value)
    }
}

impl<T> From<Status> for Expected<T> {
    fn from(status: Status) -> Self {
        Expected::Err(status)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Adapter converting a fallible closure into an `Expected<T>`, catching any
/// panic and mapping it to `Status { code: UnknownError, reason: <message> }`.
pub fn no_throw_call<T, F>(f: F) -> Expected<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(value) => Expected::Ok(value),
        Err(payload) => Expected::Err(Status::with_code(
            ErrorCode::UnknownError,
            panic_message(payload),
        )),
    }
}

/// Like [`no_throw_call`] but for closures that already return `Expected<T>`;
/// a panic inside `f` still maps to `UnknownError` rather than unwinding.
pub fn no_throw_call_expected<T, F>(f: F) -> Expected<T>
where
    F: FnOnce() -> Expected<T> + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(expected) => expected,
        Err(payload) => Expected::Err(Status::with_code(
            ErrorCode::UnknownError,
            panic_message(payload),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_then_short_circuits_on_error() {
        let e: Expected<i32> = Expected::from_status(Status::with_code(ErrorCode::LogicError, "x"));
        let mapped = e.and_then(|v| Expected::Ok(v + 1));
        assert!(mapped.is_err());
    }

    #[test]
    fn map_transforms_ok_value() {
        let e: Expected<i32> = Expected::Ok(41);
        assert_eq!(e.map(|v| v + 1), Expected::Ok(42));
    }

    #[test]
    fn or_else_runs_only_on_failure() {
        let ok: Expected<i32> = Expected::Ok(1);
        assert_eq!(ok.or_else(|_| Expected::Ok(2)), Expected::Ok(1));

        let err: Expected<i32> = Expected::from_status(Status::with_code(ErrorCode::RuntimeError, "x"));
        assert_eq!(err.or_else(|_| Expected::Ok(2)), Expected::Ok(2));
    }

    #[test]
    fn no_throw_call_converts_panic_to_unknown_error() {
        let result: Expected<i32> = no_throw_call(|| panic!("boom"));
        assert!(result.is_err());
        assert_eq!(result.status().code, ErrorCode::UnknownError);
        assert!(result.status().reason.contains("boom"));
    }

    #[test]
    fn no_throw_call_passes_through_value() {
        let result: Expected<i32> = no_throw_call(|| 7);
        assert_eq!(result, Expected::Ok(7));
    }
}
