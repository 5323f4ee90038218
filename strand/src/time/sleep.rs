use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use super::TimerKey;
use crate::{
    awaiter::{poll_awaiter, Awaiter, Continuation},
    runtime::Handle,
};

/// Waits until `duration` has elapsed.
///
/// The returned future always suspends at least once, even for a zero
/// duration: the timer is only observed by the loop's timer stage, after the
/// current drain pass. Durations too large to add to the current instant
/// sleep until a deadline decades away.
pub fn sleep(handle: &Handle, duration: Duration) -> Sleep {
    sleep_until(handle, super::deadline_after(duration))
}

/// Waits until `deadline` is reached.
pub fn sleep_until(handle: &Handle, deadline: Instant) -> Sleep {
    Sleep {
        handle: handle.clone(),
        deadline,
        key: None,
    }
}

/// Future returned by [`sleep`] and [`sleep_until`].
///
/// 定时器登记在第一次轮询时进行；被遗弃时撤销尚未触发的定时器。
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Sleep {
    handle: Handle,
    deadline: Instant,
    key: Option<TimerKey>,
}

impl Sleep {
    /// The instant this sleep finishes at.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns `true` once the timer has fired.
    pub fn is_elapsed(&self) -> bool {
        self.is_ready()
    }
}

impl Awaiter for Sleep {
    type Output = ();

    fn is_ready(&self) -> bool {
        match self.key {
            Some(key) => !self.handle.timer_pending(key),
            None => false,
        }
    }

    fn register_continuation(&mut self, cont: Continuation) {
        let cont = match self.key {
            Some(key) => match self.handle.replace_timer(key, cont) {
                Ok(()) => return,
                Err(cont) => cont,
            },
            None => cont,
        };
        self.key = Some(self.handle.register_timer(self.deadline, cont));
    }

    fn take_result(&mut self) {
        self.key = None;
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        poll_awaiter(self.get_mut(), cx)
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.handle.cancel_timer(key);
        }
    }
}

impl fmt::Debug for Sleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("registered", &self.key.is_some())
            .finish()
    }
}
