use std::{
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

use super::{promise::Promise, TaskId, TaskState};
use crate::{
    awaiter::{poll_awaiter, Awaiter, Continuation},
    error::TaskError,
    runtime::Context as LoopContext,
};

/// JoinHandle can be used to wait task finished.
/// Note if you drop it directly, task will not be terminated.
///
/// 任务等待者，丢弃后也不会导致任务终止(任务转为分离状态继续执行)。
///
/// Awaiting it yields `Ok(value)` or the [`TaskError`] that ended the task.
/// A `JoinHandle` cannot be cloned, so only one continuation can await it;
/// use [`JoinHandle::join`] for additional awaiters of a `Clone` result.
pub struct JoinHandle<T> {
    id: TaskId,
    promise: Rc<Promise<T>>,
    context: Weak<LoopContext>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(id: TaskId, promise: Rc<Promise<T>>, context: Weak<LoopContext>) -> Self {
        JoinHandle {
            id,
            promise,
            context,
        }
    }

    /// The id of the task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Checks if the task associated with this `JoinHandle` has finished.
    pub fn is_finished(&self) -> bool {
        self.promise.is_settled()
    }

    /// Current lifecycle state of the task.
    pub fn state(&self) -> TaskState {
        if let Some(state) = self.promise.settled_state() {
            return state;
        }
        self.context
            .upgrade()
            .and_then(|cx| cx.task_state(self.id))
            .unwrap_or(TaskState::Cancelled)
    }

    /// Cancels the task.
    ///
    /// A suspended task is dropped without being resumed; its timer and I/O
    /// registrations are removed and awaiting this handle yields
    /// [`TaskError::Cancelled`]. Returns `false` if the task already finished.
    pub fn cancel(&self) -> bool {
        match self.context.upgrade() {
            Some(cx) => cx.cancel(self.id),
            None => false,
        }
    }

    /// Stores `cont` as the continuation resumed when the task settles.
    pub(crate) fn set_waiter(&self, cont: Continuation) {
        let cont = match self.context.upgrade() {
            Some(cx) => cx.track_join(cont, self.id, self.promise.waiter_slot()),
            None => cont,
        };
        self.promise.set_waiter(cont);
    }

    pub(crate) fn clear_waiter(&self) {
        self.promise.clear_waiter();
    }
}

impl<T: Clone> JoinHandle<T> {
    /// Returns another awaiter for this task.
    ///
    /// It yields a clone of the task's result. Awaiting it after the task
    /// completed returns the buffered result without running anything again.
    /// Only one continuation may be waiting on a task at any moment. While a
    /// `Join` is alive, awaiting this handle also clones the result, so the
    /// two can be awaited in either order.
    pub fn join(&self) -> Join<T> {
        self.promise.add_join();
        Join {
            id: self.id,
            promise: self.promise.clone(),
            context: self.context.clone(),
            registered: false,
        }
    }
}

impl<T> Awaiter for JoinHandle<T> {
    type Output = Result<T, TaskError>;

    fn is_ready(&self) -> bool {
        self.promise.is_settled()
    }

    fn register_continuation(&mut self, cont: Continuation) {
        self.set_waiter(cont);
    }

    fn take_result(&mut self) -> Self::Output {
        self.promise.take()
    }
}

impl<T> Unpin for JoinHandle<T> {}

impl<T> Future for JoinHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaiter(self.get_mut(), cx)
    }
}

impl<T> Drop for JoinHandle<T> {
    fn drop(&mut self) {
        self.promise.drop_join_interest();
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// A cloned-result awaiter obtained from [`JoinHandle::join`].
pub struct Join<T> {
    id: TaskId,
    promise: Rc<Promise<T>>,
    context: Weak<LoopContext>,
    registered: bool,
}

impl<T> Join<T> {
    /// The id of the task.
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T: Clone> Awaiter for Join<T> {
    type Output = Result<T, TaskError>;

    fn is_ready(&self) -> bool {
        self.promise.is_settled()
    }

    fn register_continuation(&mut self, cont: Continuation) {
        let cont = match self.context.upgrade() {
            Some(cx) => cx.track_join(cont, self.id, self.promise.waiter_slot()),
            None => cont,
        };
        self.promise.set_waiter(cont);
        self.registered = true;
    }

    fn take_result(&mut self) -> Self::Output {
        self.registered = false;
        self.promise.clone_outcome()
    }
}

impl<T> Unpin for Join<T> {}

impl<T: Clone> Future for Join<T> {
    type Output = Result<T, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaiter(self.get_mut(), cx)
    }
}

impl<T> Drop for Join<T> {
    fn drop(&mut self) {
        self.promise.remove_join();
        if self.registered && !self.promise.is_settled() {
            self.promise.clear_waiter();
        }
    }
}

impl<T> fmt::Debug for Join<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join").field("id", &self.id).finish()
    }
}
