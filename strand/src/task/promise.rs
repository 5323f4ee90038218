use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use super::{TaskId, TaskState};
use crate::{awaiter::Continuation, error::TaskError};

/// 结果区状态。
enum Outcome<T> {
    /// 任务尚未结束。
    Pending,
    /// 任务已结束，结果尚未被取走。
    Ready(Result<T, TaskError>),
    /// 结果已被`JoinHandle`取走。
    Taken,
}

/// The continuation waiting on a task's result.
///
/// Tasks that park a continuation here are recorded against the slot, so the
/// loop can clear it when such a task is cancelled or finishes first.
#[derive(Default)]
pub(crate) struct WaiterSlot(RefCell<Option<Continuation>>);

impl WaiterSlot {
    fn replace(&self, cont: Continuation) -> Option<Continuation> {
        let mut waiter = self.0.borrow_mut();
        if let Some(existing) = waiter.as_ref() {
            assert!(
                existing.task().is_none() || cont.task().is_none() || existing.task() == cont.task(),
                "a task may be awaited by only one continuation at a time"
            );
        }
        waiter.replace(cont)
    }

    fn take(&self) -> Option<Continuation> {
        self.0.borrow_mut().take()
    }

    /// Drops the stored continuation if it belongs to `task`.
    pub(crate) fn forget(&self, task: TaskId) {
        let forgotten = {
            let mut waiter = self.0.borrow_mut();
            match waiter.as_ref() {
                Some(cont) if cont.task() == Some(task) => waiter.take(),
                _ => None,
            }
        };
        drop(forgotten);
    }
}

/// Per-task result cell plus the link back to whoever is waiting on it.
///
/// The outcome is written exactly once. At most one continuation waits at a
/// time; a second one from a different task is a contract violation.
pub(crate) struct Promise<T> {
    outcome: RefCell<Outcome<T>>,
    waiter: Rc<WaiterSlot>,
    join_interest: Cell<bool>,
    settled: Cell<Option<TaskState>>,
    /// Live `Join`s. While any exist the outcome is cloned out instead of
    /// moved.
    joins: Cell<usize>,
    cloner: Cell<Option<fn(&T) -> T>>,
}

/// Type-erased view the loop uses to fail a task without knowing `T`.
pub(crate) trait Settle {
    /// Settles the task with an error, resuming the waiter.
    fn fail(&self, error: TaskError);

    /// Returns `true` while the `JoinHandle` is alive.
    fn is_joined(&self) -> bool;
}

impl<T> Promise<T> {
    pub(crate) fn new() -> Self {
        Promise {
            outcome: RefCell::new(Outcome::Pending),
            waiter: Rc::default(),
            join_interest: Cell::new(true),
            settled: Cell::new(None),
            joins: Cell::new(0),
            cloner: Cell::new(None),
        }
    }

    /// Writes the outcome and hands the waiting continuation back to the loop.
    pub(crate) fn complete(&self, result: Result<T, TaskError>) {
        let state = match &result {
            Ok(_) => TaskState::Completed,
            Err(TaskError::Cancelled) => TaskState::Cancelled,
            Err(TaskError::Panicked(_)) => TaskState::Failed,
        };
        {
            let mut outcome = self.outcome.borrow_mut();
            debug_assert!(matches!(*outcome, Outcome::Pending));
            *outcome = Outcome::Ready(result);
        }
        self.settled.set(Some(state));
        let waiter = self.waiter.take();
        if let Some(waiter) = waiter {
            waiter.resume();
        }
    }

    /// The outcome has been written, whether or not it was taken since.
    pub(crate) fn is_settled(&self) -> bool {
        self.settled.get().is_some()
    }

    pub(crate) fn settled_state(&self) -> Option<TaskState> {
        self.settled.get()
    }

    /// 取走结果。只能取一次；仍有`Join`存活时改为复制结果。
    pub(crate) fn take(&self) -> Result<T, TaskError> {
        if self.joins.get() > 0 {
            if let (Some(clone), Outcome::Ready(result)) = (self.cloner.get(), &*self.outcome.borrow()) {
                return result.as_ref().map(clone).map_err(|e| e.clone());
            }
        }
        match std::mem::replace(&mut *self.outcome.borrow_mut(), Outcome::Taken) {
            Outcome::Ready(result) => result,
            Outcome::Pending => panic!("task result read before the task settled"),
            Outcome::Taken => panic!("`JoinHandle` polled after completion"),
        }
    }

    /// Stores the continuation to resume on completion.
    pub(crate) fn set_waiter(&self, cont: Continuation) {
        let previous = self.waiter.replace(cont);
        drop(previous);
    }

    /// Forgets the waiting continuation without resuming it.
    pub(crate) fn clear_waiter(&self) {
        let previous = self.waiter.take();
        drop(previous);
    }

    pub(crate) fn waiter_slot(&self) -> &Rc<WaiterSlot> {
        &self.waiter
    }

    pub(crate) fn remove_join(&self) {
        self.joins.set(self.joins.get().saturating_sub(1));
    }

    pub(crate) fn drop_join_interest(&self) {
        self.join_interest.set(false);
        self.clear_waiter();
    }
}

impl<T: Clone> Promise<T> {
    pub(crate) fn add_join(&self) {
        self.joins.set(self.joins.get() + 1);
        self.cloner.set(Some(T::clone));
    }

    /// Copies the buffered outcome out without consuming it.
    pub(crate) fn clone_outcome(&self) -> Result<T, TaskError> {
        match &*self.outcome.borrow() {
            Outcome::Ready(result) => result.clone(),
            Outcome::Pending => panic!("task result read before the task settled"),
            Outcome::Taken => panic!("task result was already moved out by its `JoinHandle`"),
        }
    }
}

impl<T> Settle for Promise<T> {
    fn fail(&self, error: TaskError) {
        if !self.is_settled() {
            self.complete(Err(error));
        }
    }

    fn is_joined(&self) -> bool {
        self.join_interest.get()
    }
}
