//! I/O readiness.
//!
//! The loop does not perform I/O itself. A task waits until a descriptor is
//! ready, then reads or writes it directly with non-blocking calls.
//!
//! 一个I/O源同一时刻只能有一个等待它的任务。

mod readiness;
pub(crate) use readiness::ReadinessTable;
pub use readiness::IoKey;

use std::{
    fmt,
    future::Future,
    io,
    os::unix::io::RawFd,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{
    awaiter::{poll_awaiter, Awaiter, Continuation},
    runtime::Handle,
};

/// Readiness a task waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// The source has data to read, or reached end of stream.
    Readable,
    /// The source can accept writes.
    Writable,
    /// Either of the above.
    Both,
}

impl From<Interest> for mio::Interest {
    fn from(interest: Interest) -> Self {
        match interest {
            Interest::Readable => mio::Interest::READABLE,
            Interest::Writable => mio::Interest::WRITABLE,
            Interest::Both => mio::Interest::READABLE.add(mio::Interest::WRITABLE),
        }
    }
}

/// Future returned by [`Handle::readable`], [`Handle::writable`] and
/// [`Handle::ready`].
///
/// Resolves to `Ok(())` once the source is ready, or to the error that kept
/// it from being registered. Dropping it removes the wait.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Readiness {
    handle: Handle,
    source: RawFd,
    interest: Interest,
    key: Option<IoKey>,
    error: Option<io::Error>,
}

impl Readiness {
    pub(crate) fn new(handle: Handle, source: RawFd, interest: Interest) -> Self {
        Readiness {
            handle,
            source,
            interest,
            key: None,
            error: None,
        }
    }

    /// The descriptor being waited on.
    pub fn source(&self) -> RawFd {
        self.source
    }
}

impl Awaiter for Readiness {
    type Output = io::Result<()>;

    fn is_ready(&self) -> bool {
        if self.error.is_some() {
            return true;
        }
        match self.key {
            Some(key) => !self.handle.io_pending(key),
            None => false,
        }
    }

    fn register_continuation(&mut self, cont: Continuation) {
        match self.handle.try_register_io(self.source, self.interest, cont) {
            Ok(key) => self.key = Some(key),
            Err((error, cont)) => {
                // Nothing will fire for this wait; hand the error back on the
                // next poll.
                self.error = Some(error);
                cont.resume();
            }
        }
    }

    fn take_result(&mut self) -> io::Result<()> {
        self.key = None;
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Future for Readiness {
    type Output = io::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaiter(self.get_mut(), cx)
    }
}

impl Drop for Readiness {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.handle.cancel_io(key);
        }
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readiness")
            .field("source", &self.source)
            .field("interest", &self.interest)
            .field("registered", &self.key.is_some())
            .finish()
    }
}
