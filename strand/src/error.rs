//! Error types.
//!
//! 运行时错误分两类：
//! - 可恢复的：任务自身失败(`TaskError`)，会路由给等待该任务的一方。
//! - 不可恢复的：运行时契约被破坏(重复恢复、悬挂登记)，直接恐慌。

use std::{any::Any, cell::Cell, io};

use crate::task::TaskId;

/// Why a task did not produce its value.
///
/// This is what an awaiter observes from [`JoinHandle`](crate::JoinHandle)
/// when the awaited task failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task's future panicked while being polled.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The task was cancelled before it completed.
    #[error("task was cancelled")]
    Cancelled,
}

impl TaskError {
    /// Returns `true` if the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Returns `true` if the task panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked(msg)
    }
}

/// Errors surfaced by [`EventLoop::run`](crate::EventLoop::run) and
/// [`EventLoop::block_on`](crate::EventLoop::block_on).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A root task failed and nobody observed the failure.
    #[error("root task {task} failed: {source}")]
    RootFailed {
        /// The failing task.
        task: TaskId,
        /// What went wrong.
        #[source]
        source: TaskError,
    },
    /// The loop ran out of work while the root task was still suspended.
    #[error("event loop stalled with {pending} suspended task(s) and nothing left to wake them")]
    Stalled {
        /// Number of live tasks left in the loop.
        pending: usize,
    },
    /// [`Handle::stop`](crate::Handle::stop) was called before the root task
    /// finished.
    #[error("event loop was stopped before the root task finished")]
    Stopped,
    /// The I/O driver failed.
    #[error("io driver error: {0}")]
    Io(#[from] io::Error),
}

/// The deadline of a [`timeout`](crate::time::timeout) passed before the
/// inner future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline has elapsed")]
pub struct TimeoutExpired;

thread_local! {
    // 置位表示当前展开的恐慌是运行时故障，事件循环不得把它当作任务失败吞掉。
    static FAULTING: Cell<bool> = const { Cell::new(false) };
}

#[cold]
#[track_caller]
fn raise_fault(msg: String) -> ! {
    FAULTING.with(|f| f.set(true));
    std::panic::panic_any(msg)
}

/// Returns `true`, and clears the mark, if the panic being caught was raised
/// as a runtime fault.
pub(crate) fn take_fault() -> bool {
    FAULTING.with(|f| f.replace(false))
}

/// A task was handed to the ready queue while it was not waiting to run.
///
/// 同一个续体被推入就绪队列两次。这意味着某个等待器实现有缺陷，继续执行会破坏调度器状态。
#[cold]
#[track_caller]
pub(crate) fn double_resume_fault(task: TaskId) -> ! {
    raise_fault(format!(
        "double resume fault: {task} was resumed while it was not scheduled"
    ))
}

/// A task was released while the loop still held registrations for it.
#[cold]
#[track_caller]
pub(crate) fn dangling_registration_fault(task: TaskId, registrations: usize) -> ! {
    raise_fault(format!(
        "dangling registration fault: {task} was released with {registrations} pending \
         registration(s)"
    ))
}
