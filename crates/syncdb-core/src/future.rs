//! Single-producer/single-consumer `Future<T>`/`Promise<T>` (C1).
//!
//! The shared state moves `Init -> Waiting -> Finished`; the blocking
//! [`Future::get`] path is the only place that touches the condvar. Every
//! other path (callback-based `get_async`, `then`) is lock-free past the
//! initial `Mutex` acquisition, matching the "atomic state word plus a
//! mutex+condvar used only for the blocking get() path" contract.

use std::sync::{Arc, Condvar, Mutex};

use crate::error::{ErrorCode, Status};
use crate::expected::Expected;

type Callback<T> = Box<dyn FnOnce(Expected<T>) + Send>;

enum Slot<T> {
    Empty,
    Ready(Expected<T>),
    Callback(Callback<T>),
    Taken,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    condvar: Condvar,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Shared {
            slot: Mutex::new(Slot::Empty),
            condvar: Condvar::new(),
        }
    }

    fn complete(&self, value: Expected<T>) {
        let mut guard = self.slot.lock().expect("future shared state poisoned");
        match std::mem::replace(&mut *guard, Slot::Taken) {
            Slot::Callback(cb) => {
                drop(guard);
                cb(value);
            }
            Slot::Empty => {
                *guard = Slot::Ready(value);
                self.condvar.notify_all();
            }
            Slot::Ready(_) | Slot::Taken => {
                panic!("Promise completed more than once");
            }
        }
    }
}

/// The writer half. Dropping a `Promise` without calling `emplace_value` or
/// `set_error` resolves the paired future with `ErrorCode::BrokenPromise`.
pub struct Promise<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Promise<T> {
    pub fn emplace_value(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Expected::Ok(value));
        }
    }

    pub fn set_error(mut self, status: Status) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Expected::Err(status));
        }
    }

    pub fn complete(mut self, value: Expected<T>) {
        if let Some(shared) = self.shared.take() {
            shared.complete(value);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.complete(Expected::Err(Status::with_code(
                ErrorCode::BrokenPromise,
                "promise dropped without a value",
            )));
        }
    }
}

/// The reader half. Exactly one terminal observer (`get`, `get_async`,
/// `then`/`on_completion`/`on_error`, or simply dropping the future) may be
/// used per instance.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a connected `(Promise<T>, Future<T>)` pair.
pub fn future_channel<T>() -> (Promise<T>, Future<T>) {
    let shared = Arc::new(Shared::new());
    (
        Promise {
            shared: Some(shared.clone()),
        },
        Future { shared },
    )
}

impl<T: Send + 'static> Future<T> {
    pub fn ready(value: Expected<T>) -> Self {
        let shared = Arc::new(Shared::new());
        shared.complete(value);
        Future { shared }
    }

    pub fn from_value(value: T) -> Self {
        Future::ready(Expected::Ok(value))
    }

    pub fn from_status(status: Status) -> Self {
        Future::ready(Expected::Err(status))
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.shared.slot.lock().expect("poisoned"), Slot::Ready(_))
    }

    /// Blocks the calling thread until the value is available.
    pub fn get(self) -> Expected<T> {
        let mut guard = self.shared.slot.lock().expect("future shared state poisoned");
        loop {
            match std::mem::replace(&mut *guard, Slot::Taken) {
                Slot::Ready(value) => return value,
                Slot::Empty => {
                    *guard = Slot::Empty;
                    guard = self
                        .shared
                        .condvar
                        .wait(guard)
                        .expect("future shared state poisoned");
                }
                Slot::Callback(_) | Slot::Taken => {
                    panic!("Future::get called after another observer was installed");
                }
            }
        }
    }

    /// Blocks and unwraps, panicking with the status reason on failure.
    pub fn get_no_throw(self) -> T {
        match self.get() {
            Expected::Ok(v) => v,
            Expected::Err(s) => panic!("future resolved to an error: {s}"),
        }
    }

    /// Invokes `cb` exactly once with the resolved value, either inline (if
    /// already ready) or on the thread that completes the paired promise.
    pub fn get_async<F>(self, cb: F)
    where
        F: FnOnce(Expected<T>) + Send + 'static,
    {
        let mut guard = self.shared.slot.lock().expect("future shared state poisoned");
        match std::mem::replace(&mut *guard, Slot::Taken) {
            Slot::Ready(value) => {
                drop(guard);
                cb(value);
            }
            Slot::Empty => {
                *guard = Slot::Callback(Box::new(cb));
            }
            Slot::Callback(_) | Slot::Taken => {
                panic!("Future observed by more than one continuation");
            }
        }
    }

    /// Chains a continuation that itself produces a `Future<U>`; the nested
    /// future is automatically unwrapped into the returned future. Skipped
    /// (error propagated) if `self` resolves to a failure.
    pub fn then<U, F>(self, f: F) -> Future<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Future<U> + Send + 'static,
    {
        let (promise, future) = future_channel();
        self.get_async(move |expected| match expected {
            Expected::Ok(value) => {
                let inner = f(value);
                inner.get_async(move |inner_expected| promise.complete(inner_expected));
            }
            Expected::Err(status) => promise.set_error(status),
        });
        future
    }

    /// Chains a continuation producing a plain value (wrapped as a
    /// ready future internally, with no further unwrapping needed).
    pub fn map<U, F>(self, f: F) -> Future<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (promise, future) = future_channel();
        self.get_async(move |expected| match expected {
            Expected::Ok(value) => promise.emplace_value(f(value)),
            Expected::Err(status) => promise.set_error(status),
        });
        future
    }

    /// Runs `f` only on failure; `f` may recover with a new value.
    pub fn on_error<F>(self, f: F) -> Future<T>
    where
        F: FnOnce(Status) -> Expected<T> + Send + 'static,
    {
        let (promise, future) = future_channel();
        self.get_async(move |expected| match expected {
            Expected::Ok(value) => promise.emplace_value(value),
            Expected::Err(status) => promise.complete(f(status)),
        });
        future
    }

    /// Runs `f` with the final `Expected<T>` regardless of outcome.
    pub fn on_completion<F>(self, f: F)
    where
        F: FnOnce(Expected<T>) + Send + 'static,
    {
        self.get_async(f);
    }

    /// Discards the value, keeping only success/failure.
    pub fn ignore_value(self) -> Future<()> {
        self.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn ready_future_reports_is_ready() {
        let f = Future::from_value(42);
        assert!(f.is_ready());
        assert_eq!(f.get(), Expected::Ok(42));
    }

    #[test]
    fn blocking_get_waits_for_promise() {
        let (promise, future) = future_channel::<i32>();
        let handle = thread::spawn(move || {
            promise.emplace_value(7);
        });
        assert_eq!(future.get(), Expected::Ok(7));
        handle.join().unwrap();
    }

    #[test]
    fn dropped_promise_breaks_the_future() {
        let (promise, future) = future_channel::<i32>();
        drop(promise);
        assert_eq!(future.get().status().code, ErrorCode::BrokenPromise);
    }

    #[test]
    fn then_chains_and_auto_unwraps_nested_future() {
        let (promise, future) = future_channel::<i32>();
        let chained = future
            .then(|x| Future::from_value(x.to_string()))
            .map(|s| s.len());
        promise.emplace_value(42);
        assert_eq!(chained.get(), Expected::Ok(2));
    }

    #[test]
    fn then_skips_callback_on_error() {
        let (promise, future) = future_channel::<i32>();
        let chained: Future<i32> = future.then(|x| Future::from_value(x + 1));
        promise.set_error(Status::with_code(ErrorCode::RuntimeError, "boom"));
        assert_eq!(chained.get().status().code, ErrorCode::RuntimeError);
    }

    #[test]
    fn get_async_runs_inline_when_already_ready() {
        let f = Future::from_value(5);
        let seen = Arc::new(Mutex::new(None));
        let seen2 = seen.clone();
        f.get_async(move |v| *seen2.lock().unwrap() = Some(v));
        assert_eq!(*seen.lock().unwrap(), Some(Expected::Ok(5)));
    }
}
