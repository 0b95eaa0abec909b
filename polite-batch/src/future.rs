//! One-shot promise/future pair used to hand a lookup result back to the
//! caller that queued it.
use crate::BatchError;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;

/// Create a linked promise and future. The promise is resolved exactly once
/// because [`Promise::resolve`] consumes it.
pub fn promise<T>() -> (Promise<T>, FutureResult<T>) {
    let (tx, rx) = oneshot::channel();
    (Promise { tx }, FutureResult { rx })
}

/// Write side, held by the pending queue until the processor resolves it.
#[derive(Debug)]
pub struct Promise<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Promise<T> {
    /// Deliver `value`. Returns `false` when the caller already dropped its
    /// [`FutureResult`].
    pub fn resolve(self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }

    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Read side returned by `get_one_async`.
///
/// Awaiting it yields the looked up record, the record type's default value
/// when nothing matched, or [`BatchError::ProcessorGone`] if the processor
/// was dropped with this request still queued.
#[derive(Debug)]
#[must_use = "a lookup does nothing unless its result is awaited"]
pub struct FutureResult<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> FutureResult<T> {
    /// Block the current thread until the result arrives.
    ///
    /// For worker threads outside the async runtime. Panics if called from
    /// within an async context, like [`oneshot::Receiver::blocking_recv`].
    pub fn wait(self) -> Result<T, BatchError> {
        self.rx.blocking_recv().map_err(|_| BatchError::ProcessorGone)
    }
}

impl<T> Future for FutureResult<T> {
    type Output = Result<T, BatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map_err(|_| BatchError::ProcessorGone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_then_await() {
        let (promise, future) = promise::<u32>();
        assert!(promise.resolve(7));
        assert_eq!(future.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_promise_reports_processor_gone() {
        let (promise, future) = promise::<u32>();
        drop(promise);
        assert!(matches!(future.await, Err(BatchError::ProcessorGone)));
    }

    #[test]
    fn test_resolve_after_caller_gone() {
        let (promise, future) = promise::<u32>();
        drop(future);
        assert!(promise.is_abandoned());
        assert!(!promise.resolve(1));
    }

    #[test]
    fn test_blocking_wait_from_thread() {
        let (promise, future) = promise::<String>();
        let waiter = std::thread::spawn(move || future.wait());
        promise.resolve("done".to_string());
        assert_eq!(waiter.join().unwrap().unwrap(), "done");
    }
}
