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

/// Waits for every task to settle.
///
/// Results keep the position of their task, whatever order the tasks
/// finished in. A failure does not cancel the other tasks: all of them are
/// awaited, and the earliest failure is available through
/// [`AllResults::first_failure`].
pub fn when_all<T, I>(handles: I) -> WhenAll<T>
where
    I: IntoIterator<Item = JoinHandle<T>>,
{
    WhenAll {
        handles: handles.into_iter().collect(),
        latch: None,
        settled_early: Vec::new(),
    }
}

/// Future returned by [`when_all`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WhenAll<T> {
    handles: Vec<JoinHandle<T>>,
    latch: Option<Rc<Latch>>,
    // Tasks already settled when the wait was registered, in index order.
    settled_early: Vec<usize>,
}

impl<T> Awaiter for WhenAll<T> {
    type Output = AllResults<T>;

    fn is_ready(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    fn register_continuation(&mut self, cont: Continuation) {
        if let Some(latch) = &self.latch {
            latch.set_parent(cont);
            return;
        }

        let pending: Vec<usize> = (0..self.handles.len())
            .filter(|&i| !self.handles[i].is_finished())
            .collect();
        self.settled_early = (0..self.handles.len())
            .filter(|&i| self.handles[i].is_finished())
            .collect();

        let latch = Rc::new(Latch::new(Mode::All, pending.len()));
        let (task, loop_id) = (cont.task(), cont.loop_id().unwrap_or_default());
        latch.set_parent(cont);
        for index in pending {
            let arm = Continuation::arm(latch.clone(), index, task, loop_id);
            self.handles[index].set_waiter(arm);
        }
        self.latch = Some(latch);
    }

    fn take_result(&mut self) -> AllResults<T> {
        let mut order = std::mem::take(&mut self.settled_early);
        match self.latch.take() {
            Some(latch) => order.extend(latch.arrivals()),
            None => order.extend(0..self.handles.len()),
        }

        let results: Vec<Result<T, TaskError>> = self
            .handles
            .iter_mut()
            .map(|handle| handle.take_result())
            .collect();
        let first_failure = order
            .into_iter()
            .find(|&index| results.get(index).map_or(false, Result::is_err));
        AllResults {
            results,
            first_failure,
        }
    }
}

impl<T> Unpin for WhenAll<T> {}

impl<T> Future for WhenAll<T> {
    type Output = AllResults<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaiter(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for WhenAll<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhenAll")
            .field("tasks", &self.handles.len())
            .field(
                "finished",
                &self.handles.iter().filter(|h| h.is_finished()).count(),
            )
            .finish()
    }
}

/// Position-stable results of [`when_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllResults<T> {
    results: Vec<Result<T, TaskError>>,
    first_failure: Option<usize>,
}

impl<T> AllResults<T> {
    /// The failure that happened first, with the position of its task.
    pub fn first_failure(&self) -> Option<(usize, &TaskError)> {
        let index = self.first_failure?;
        match &self.results[index] {
            Err(error) => Some((index, error)),
            Ok(_) => None,
        }
    }

    /// Every result, in task order.
    pub fn into_vec(self) -> Vec<Result<T, TaskError>> {
        self.results
    }

    /// All values, or the first failure.
    pub fn into_result(self) -> Result<Vec<T>, TaskError> {
        let mut values = Vec::with_capacity(self.results.len());
        let mut failure = None;
        for (index, result) in self.results.into_iter().enumerate() {
            match result {
                Ok(value) => values.push(value),
                Err(error) if Some(index) == self.first_failure => failure = Some(error),
                Err(_) => {}
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(values),
        }
    }

    /// Iterates over the results in task order.
    pub fn iter(&self) -> std::slice::Iter<'_, Result<T, TaskError>> {
        self.results.iter()
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` when no task was awaited.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> std::ops::Index<usize> for AllResults<T> {
    type Output = Result<T, TaskError>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.results[index]
    }
}

impl<T> IntoIterator for AllResults<T> {
    type Item = Result<T, TaskError>;
    type IntoIter = std::vec::IntoIter<Result<T, TaskError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
