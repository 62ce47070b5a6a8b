//! Coalescing event-loop trigger (C3).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Anything capable of scheduling a closure to run later, e.g. a channel
/// sender, a tokio task spawner, or a GUI toolkit's "post to main thread".
pub trait EventLoop: Send + Sync + 'static {
    fn post(&self, task: Box<dyn FnOnce() + Send>);
}

const IDLE: u8 = 0;
const TRIGGERED: u8 = 1;
const DESTROYED: u8 = 2;

struct TriggerHolder<L: EventLoop, F> {
    state: AtomicU8,
    event_loop: L,
    handler: F,
}

/// A handle that schedules at most one pending invocation of `handler` on
/// `event_loop` per burst of `trigger()` calls. After every `trigger()` call
/// there is guaranteed to be at least one subsequent handler invocation that
/// begins after that call returns, unless the event loop is destroyed first.
pub struct Trigger<L: EventLoop, F> {
    holder: Arc<TriggerHolder<L, F>>,
}

impl<L, F> Trigger<L, F>
where
    L: EventLoop,
    F: Fn() + Send + Sync + 'static,
{
    pub fn new(event_loop: L, handler: F) -> Self {
        Trigger {
            holder: Arc::new(TriggerHolder {
                state: AtomicU8::new(IDLE),
                event_loop,
                handler,
            }),
        }
    }

    /// Coalescing trigger: a no-op if already `Triggered` or `Destroyed`.
    pub fn trigger(&self) {
        if self
            .holder
            .state
            .compare_exchange(IDLE, TRIGGERED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let holder = self.holder.clone();
        self.holder.event_loop.post(Box::new(move || {
            // Reset to Idle before invoking the handler so a self-trigger
            // from inside `handler` schedules a fresh post rather than
            // reentering this invocation.
            let prior = holder.state.swap(IDLE, Ordering::AcqRel);
            if prior == DESTROYED {
                return;
            }
            (holder.handler)();
        }));
    }
}

impl<L: EventLoop, F> Drop for Trigger<L, F> {
    fn drop(&mut self) {
        self.holder.state.store(DESTROYED, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Runs posted tasks synchronously and immediately, for deterministic tests.
    struct InlineEventLoop {
        queue: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    }

    impl InlineEventLoop {
        fn new() -> Self {
            InlineEventLoop {
                queue: Mutex::new(Vec::new()),
            }
        }

        fn drain(&self) {
            loop {
                let task = self.queue.lock().unwrap().pop();
                match task {
                    Some(t) => t(),
                    None => break,
                }
            }
        }
    }

    impl EventLoop for Arc<InlineEventLoop> {
        fn post(&self, task: Box<dyn FnOnce() + Send>) {
            self.queue.lock().unwrap().push(task);
        }
    }

    #[test]
    fn burst_of_triggers_runs_handler_at_least_once() {
        let loop_ = Arc::new(InlineEventLoop::new());
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let trigger = Trigger::new(loop_.clone(), move || {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        trigger.trigger();
        trigger.trigger();
        trigger.trigger();
        loop_.drain();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroyed_trigger_post_is_a_no_op() {
        let loop_ = Arc::new(InlineEventLoop::new());
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let trigger = Trigger::new(loop_.clone(), move || {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        trigger.trigger();
        drop(trigger);
        loop_.drain();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
