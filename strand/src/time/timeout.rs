use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use super::{sleep, sleep_until, Sleep};
use crate::{error::TimeoutExpired, runtime::Handle};

/// Requires `future` to complete within `duration`.
///
/// If the deadline passes first, the inner future is dropped and
/// [`TimeoutExpired`] is returned.
pub fn timeout<F: Future>(handle: &Handle, duration: Duration, future: F) -> Timeout<F> {
    Timeout {
        future,
        delay: sleep(handle, duration),
    }
}

/// Requires `future` to complete before `deadline`.
pub fn timeout_at<F: Future>(handle: &Handle, deadline: Instant, future: F) -> Timeout<F> {
    Timeout {
        future,
        delay: sleep_until(handle, deadline),
    }
}

pin_project_lite::pin_project! {
    /// Future returned by [`timeout`] and [`timeout_at`].
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    #[derive(Debug)]
    pub struct Timeout<F> {
        #[pin]
        future: F,
        delay: Sleep,
    }
}

impl<F> Timeout<F> {
    /// Gets a reference to the underlying future.
    pub fn get_ref(&self) -> &F {
        &self.future
    }

    /// Consumes the timeout, returning the underlying future.
    pub fn into_inner(self) -> F {
        self.future
    }
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, TimeoutExpired>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        // First, try polling the future
        if let Poll::Ready(v) = this.future.poll(cx) {
            return Poll::Ready(Ok(v));
        }

        // Now check the timer
        match Pin::new(this.delay).poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(TimeoutExpired)),
            Poll::Pending => Poll::Pending,
        }
    }
}
