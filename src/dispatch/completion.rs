//! One-shot completion handles for asynchronous storage calls.
//!
//! A call produces a ([`Completion`], [`Completer`]) pair. The storage side
//! keeps the completer and resolves it exactly once with the call's return
//! code and reply buffer; the caller consumes the completion in one of three
//! ways: blocking wait, continuation callback, or `.await`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::{Condvar, Mutex};

use crate::dispatch::store::ECANCELED;

/// Return code and reply buffer of a finished call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub return_code: i32,
    pub buffer: Vec<u8>,
}

type Callback = Box<dyn FnOnce(CompletionOutcome) + Send + 'static>;

enum State {
    Pending {
        callback: Option<Callback>,
        waker: Option<Waker>,
    },
    Ready(CompletionOutcome),
    Delivered,
}

struct Shared {
    state: Mutex<State>,
    resolved: Condvar,
}

/// Caller side of an in-flight call against one object.
pub struct Completion {
    object_id: String,
    shared: Arc<Shared>,
}

/// Storage side of an in-flight call.
///
/// Dropping a completer without resolving it resolves the call with
/// `-ECANCELED`, so waiters never hang on a lost call.
pub struct Completer {
    object_id: String,
    shared: Option<Arc<Shared>>,
}

impl Completion {
    /// Create a pending completion for `object_id` and its completer.
    pub fn pending(object_id: impl Into<String>) -> (Completion, Completer) {
        let object_id = object_id.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Pending {
                callback: None,
                waker: None,
            }),
            resolved: Condvar::new(),
        });

        (
            Completion {
                object_id: object_id.clone(),
                shared: Arc::clone(&shared),
            },
            Completer {
                object_id,
                shared: Some(shared),
            },
        )
    }

    /// A completion that is already resolved.
    pub fn ready(object_id: impl Into<String>, return_code: i32, buffer: Vec<u8>) -> Completion {
        let (completion, completer) = Self::pending(object_id);
        completer.complete(return_code, buffer);
        completion
    }

    /// Object this call targets.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Whether the call has been resolved.
    pub fn is_complete(&self) -> bool {
        matches!(*self.shared.state.lock(), State::Ready(_))
    }

    /// Block the current thread until the call resolves.
    pub fn wait_blocking(self) -> CompletionOutcome {
        let mut state = self.shared.state.lock();
        loop {
            match std::mem::replace(&mut *state, State::Delivered) {
                State::Ready(outcome) => return outcome,
                pending @ State::Pending { .. } => {
                    *state = pending;
                    self.shared.resolved.wait(&mut state);
                }
                State::Delivered => unreachable!("completion outcome delivered twice"),
            }
        }
    }

    /// Run `callback` with the outcome once the call resolves.
    ///
    /// The callback runs on the thread that resolves the call, or right away
    /// on the current thread if the call has already resolved.
    pub fn on_complete<F>(self, callback: F)
    where
        F: FnOnce(CompletionOutcome) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, State::Delivered) {
            State::Ready(outcome) => {
                drop(state);
                callback(outcome);
            }
            State::Pending { waker, .. } => {
                *state = State::Pending {
                    callback: Some(Box::new(callback)),
                    waker,
                };
            }
            State::Delivered => unreachable!("completion outcome delivered twice"),
        }
    }
}

impl Future for Completion {
    type Output = CompletionOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<CompletionOutcome> {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, State::Delivered) {
            State::Ready(outcome) => Poll::Ready(outcome),
            State::Pending { callback, .. } => {
                *state = State::Pending {
                    callback,
                    waker: Some(cx.waker().clone()),
                };
                Poll::Pending
            }
            State::Delivered => panic!("completion polled after it returned its outcome"),
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("object_id", &self.object_id)
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl Completer {
    /// Object this call targets.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Resolve the call.
    pub fn complete(mut self, return_code: i32, buffer: Vec<u8>) {
        if let Some(shared) = self.shared.take() {
            resolve(
                &shared,
                CompletionOutcome {
                    return_code,
                    buffer,
                },
            );
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            resolve(
                &shared,
                CompletionOutcome {
                    return_code: -ECANCELED,
                    buffer: Vec::new(),
                },
            );
        }
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("object_id", &self.object_id)
            .field("resolved", &self.shared.is_none())
            .finish()
    }
}

fn resolve(shared: &Shared, outcome: CompletionOutcome) {
    let mut state = shared.state.lock();
    match std::mem::replace(&mut *state, State::Delivered) {
        State::Pending {
            callback: Some(callback),
            ..
        } => {
            drop(state);
            callback(outcome);
        }
        State::Pending {
            callback: None,
            waker,
        } => {
            *state = State::Ready(outcome);
            drop(state);
            shared.resolved.notify_all();
            if let Some(waker) = waker {
                waker.wake();
            }
        }
        // A completer resolves at most once.
        resolved => *state = resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_blocking_across_threads() {
        let (completion, completer) = Completion::pending("obj");
        assert!(!completion.is_complete());

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete(12, vec![1, 2, 3]);
        });

        let outcome = completion.wait_blocking();
        assert_eq!(outcome.return_code, 12);
        assert_eq!(outcome.buffer, vec![1, 2, 3]);
        handle.join().unwrap();
    }

    #[test]
    fn test_callback_runs_on_resolving_thread() {
        let (completion, completer) = Completion::pending("obj");
        let (tx, rx) = crossbeam_channel::bounded(1);

        completion.on_complete(move |outcome| {
            let name = thread::current().name().map(str::to_string);
            tx.send((outcome.return_code, name)).unwrap();
        });

        thread::Builder::new()
            .name("resolver".to_string())
            .spawn(move || completer.complete(-5, Vec::new()))
            .unwrap()
            .join()
            .unwrap();

        let (code, name) = rx.recv().unwrap();
        assert_eq!(code, -5);
        assert_eq!(name.as_deref(), Some("resolver"));
    }

    #[test]
    fn test_callback_on_resolved_completion_runs_immediately() {
        let completion = Completion::ready("obj", 1, Vec::new());
        assert!(completion.is_complete());

        let (tx, rx) = crossbeam_channel::bounded(1);
        completion.on_complete(move |outcome| tx.send(outcome).unwrap());
        assert_eq!(rx.try_recv().unwrap().return_code, 1);
    }

    #[test]
    fn test_dropped_completer_cancels() {
        let (completion, completer) = Completion::pending("obj");
        drop(completer);
        let outcome = completion.wait_blocking();
        assert_eq!(outcome.return_code, -ECANCELED);
        assert!(outcome.buffer.is_empty());
    }

    #[test]
    fn test_future() {
        let (completion, completer) = Completion::pending("obj");
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.complete(3, vec![9]);
        });

        let outcome = futures::executor::block_on(completion);
        assert_eq!(outcome.return_code, 3);
        assert_eq!(outcome.buffer, vec![9]);
        handle.join().unwrap();
    }
}
