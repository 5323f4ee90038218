use std::{
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use super::{Latch, Mode};
use crate::{
    awaiter::{poll_awaiter, Awaiter, Continuation},
    error::TaskError,
    task::JoinHandle,
};

/// Waits for the first task to settle.
///
/// The other tasks are **not** cancelled. They keep running and are returned
/// in [`AnyResult::remaining`]; cancel them explicitly if they are no longer
/// wanted.
///
/// # Panics
///
/// Panics if `handles` is empty: there is nothing that could ever finish.
pub fn when_any<T, I>(handles: I) -> WhenAny<T>
where
    I: IntoIterator<Item = JoinHandle<T>>,
{
    let handles: Vec<JoinHandle<T>> = handles.into_iter().collect();
    assert!(!handles.is_empty(), "when_any called with no tasks");
    WhenAny {
        handles,
        latch: None,
    }
}

/// Future returned by [`when_any`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WhenAny<T> {
    handles: Vec<JoinHandle<T>>,
    latch: Option<Rc<Latch>>,
}

impl<T> WhenAny<T> {
    fn winner(&self) -> Option<usize> {
        let first_arrival = self
            .latch
            .as_ref()
            .and_then(|latch| latch.arrivals().first().copied());
        first_arrival.or_else(|| self.handles.iter().position(JoinHandle::is_finished))
    }
}

impl<T> Awaiter for WhenAny<T> {
    type Output = AnyResult<T>;

    fn is_ready(&self) -> bool {
        self.handles.iter().any(JoinHandle::is_finished)
    }

    fn register_continuation(&mut self, cont: Continuation) {
        if let Some(latch) = &self.latch {
            latch.set_parent(cont);
            return;
        }

        let latch = Rc::new(Latch::new(Mode::Any, self.handles.len()));
        let (task, loop_id) = (cont.task(), cont.loop_id().unwrap_or_default());
        latch.set_parent(cont);
        for (index, handle) in self.handles.iter().enumerate() {
            handle.set_waiter(Continuation::arm(latch.clone(), index, task, loop_id));
        }
        self.latch = Some(latch);
    }

    fn take_result(&mut self) -> AnyResult<T> {
        let index = self
            .winner()
            .unwrap_or_else(|| unreachable!("when_any resumed before any task settled"));
        self.latch = None;

        let mut remaining = Vec::with_capacity(self.handles.len().saturating_sub(1));
        let mut winner = None;
        for (i, handle) in std::mem::take(&mut self.handles).into_iter().enumerate() {
            if i == index {
                winner = Some(handle);
            } else {
                // The losers go back to the caller without our arms attached.
                handle.clear_waiter();
                remaining.push((i, handle));
            }
        }
        let result = match winner {
            Some(mut handle) => handle.take_result(),
            None => unreachable!("winner index out of range"),
        };
        AnyResult {
            index,
            result,
            remaining,
        }
    }
}

impl<T> Unpin for WhenAny<T> {}

impl<T> Future for WhenAny<T> {
    type Output = AnyResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaiter(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for WhenAny<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenAny")
            .field("tasks", &self.handles.len())
            .finish()
    }
}

/// Outcome of [`when_any`].
#[derive(Debug)]
pub struct AnyResult<T> {
    /// Position of the task that settled first.
    pub index: usize,
    /// Its result.
    pub result: Result<T, TaskError>,
    /// The other tasks with their positions. They are still running.
    pub remaining: Vec<(usize, JoinHandle<T>)>,
}

impl<T> AnyResult<T> {
    /// Cancels every remaining task. Returns how many were still live.
    pub fn cancel_remaining(&self) -> usize {
        self.remaining
            .iter()
            .filter(|(_, handle)| handle.cancel())
            .count()
    }
}
