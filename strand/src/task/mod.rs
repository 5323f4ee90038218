//! Task impl
//!
//! 任务由事件循环的任务竞技场(arena)持有，外部通过`JoinHandle`观察其结果。
//! 任务在挂起期间其future归循环所有，因此任务不可能在登记未撤销时被外部销毁。

mod arena;
pub(crate) use self::arena::TaskArena;

mod join;
pub use self::join::{Join, JoinHandle};

pub(crate) mod promise;
use self::promise::{Promise, Settle, WaiterSlot};

pub(crate) mod state;
use self::state::State;

pub(crate) mod waker;
pub(crate) mod waker_fn;

mod yield_now;
pub use self::yield_now::{yield_now, YieldNow};

use std::{
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
    time::Instant,
};

/// Identity of a task inside its event loop.
///
/// The generation makes ids of released tasks stale, so a late wake for a
/// finished task can never reach the task that reuses its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    index: u32,
    generation: u32,
}

impl TaskId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        TaskId { index, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({}.{})", self.index, self.generation)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}.{}", self.index, self.generation)
    }
}

/// What a suspended task is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// A timer with this deadline.
    Timer {
        /// When the timer fires.
        deadline: Instant,
    },
    /// Readiness of an I/O source.
    #[cfg(unix)]
    Io {
        /// The raw descriptor being waited on.
        source: std::os::unix::io::RawFd,
    },
    /// Completion of another task.
    Task(TaskId),
    /// Suspended without a registration the loop knows about.
    Unregistered,
}

/// Observable lifecycle of a task.
///
/// 任务生命周期：
/// - Created：已创建，尚未执行过。
/// - Scheduled：位于就绪队列中等待执行。
/// - Running：正在执行。
/// - Suspended：挂起，附带挂起原因。
/// - Completed / Failed / Cancelled：终态，只会发生一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Spawned but never polled.
    Created,
    /// Sitting in the ready queue.
    Scheduled,
    /// Being polled right now.
    Running,
    /// Waiting to be resumed.
    Suspended(SuspendReason),
    /// Produced its value.
    Completed,
    /// Panicked.
    Failed,
    /// Cancelled before it completed.
    Cancelled,
}

impl TaskState {
    /// Returns `true` for the three terminal states.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

/// A live task as stored in the arena.
pub(crate) struct TaskEntry {
    pub(crate) state: State,
    /// `None` while the task is being polled.
    pub(crate) future: Option<BoxFuture>,
    pub(crate) promise: Rc<dyn Settle>,
    pub(crate) reason: Cell<Option<SuspendReason>>,
    /// Continuations of this task currently stored by the loop or by other
    /// tasks' promises.
    pub(crate) registrations: Cell<usize>,
    /// Promise waiter slots this task has parked a continuation in.
    pub(crate) awaiting: RefCell<Vec<Weak<WaiterSlot>>>,
    /// Submitted directly to the loop rather than spawned by another task.
    pub(crate) root: bool,
    pub(crate) cancel_requested: bool,
}

impl TaskEntry {
    pub(crate) fn observe(&self) -> TaskState {
        let snapshot = self.state.load();
        if snapshot.is_running() {
            TaskState::Running
        } else if snapshot.is_notified() {
            if snapshot.is_started() {
                TaskState::Scheduled
            } else {
                TaskState::Created
            }
        } else {
            TaskState::Suspended(self.reason.get().unwrap_or(SuspendReason::Unregistered))
        }
    }
}

pin_project_lite::pin_project! {
    /// Drives the user future and settles the promise with its output.
    struct Spawned<F: Future> {
        #[pin]
        future: F,
        promise: Rc<Promise<F::Output>>,
    }
}

impl<F: Future> Future for Spawned<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(value) => {
                this.promise.complete(Ok(value));
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// 根据提供的异步操作创建任务。返回任务条目(交给竞技场)和结果单元。
pub(crate) fn new_task<F>(future: F, root: bool) -> (TaskEntry, Rc<Promise<F::Output>>)
where
    F: Future + 'static,
    F::Output: 'static,
{
    let promise = Rc::new(Promise::new());
    let spawned = Spawned {
        future,
        promise: promise.clone(),
    };
    let entry = TaskEntry {
        state: State::new(),
        future: Some(Box::pin(spawned)),
        promise: promise.clone(),
        reason: Cell::new(None),
        registrations: Cell::new(0),
        awaiting: RefCell::new(Vec::new()),
        root,
        cancel_requested: false,
    };
    (entry, promise)
}
