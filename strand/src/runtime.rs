use std::{
    cell::{Cell, RefCell},
    future::Future,
    io,
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
    rc::{Rc, Weak},
    sync::atomic::{AtomicU64, Ordering},
    task::{Context as PollContext, Poll},
    thread::{self, ThreadId},
    time::{Duration, Instant},
};
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};

use fxhash::FxHashMap;
use tracing::{debug, trace, warn};

#[cfg(unix)]
use crate::io::{Interest, IoKey, Readiness, ReadinessTable};
use crate::{
    awaiter::{Awaiter, Continuation},
    builder::EventLoopBuilder,
    error::{self, dangling_registration_fault, double_resume_fault, Error, TaskError},
    scheduler::TaskQueue,
    task::{
        new_task,
        promise::WaiterSlot,
        state::TransitionToIdle,
        state::TransitionToNotified,
        waker::task_waker,
        BoxFuture, JoinHandle, SuspendReason, TaskArena, TaskId, TaskState,
    },
    time::{Sleep, TimerKey, TimerTable},
};

// 线程当前时刻正在驱动的事件循环上下文。
// - 1.一旦本线程启动了事件循环(run/block_on)，设置为该循环的上下文。
// - 2.事件循环退出后恢复为未设置状态，因此同一线程上不能嵌套运行。
scoped_tls::scoped_thread_local!(pub(crate) static CURRENT: Context);

thread_local! {
    // 本线程上所有存活事件循环的登记表，唤醒器通过循环编号找到对应循环。
    static LOOPS: RefCell<FxHashMap<u64, Weak<Context>>> = RefCell::new(FxHashMap::default());
}

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by an [`EventLoop`] and its [`Handle`]s.
///
/// 事件循环上下文：任务竞技场、就绪队列、定时器结构和就绪表。
/// 所有结构只由循环所在线程修改。
pub(crate) struct Context {
    /// Unique among the loops of the process.
    pub(crate) id: u64,

    /// Thread the loop was built on. Wakers carry it to reject foreign wakes.
    thread: ThreadId,

    /// Every live task.
    tasks: RefCell<TaskArena>,

    /// Local run queue
    ///
    /// 就绪队列
    ready: TaskQueue,

    timers: RefCell<TimerTable>,

    /// `None` when the loop was built with I/O disabled.
    #[cfg(unix)]
    io: Option<RefCell<ReadinessTable>>,

    /// Task being polled right now.
    current: Cell<Option<TaskId>>,

    /// Root tasks that panicked after their `JoinHandle` was dropped.
    unobserved: RefCell<Vec<(TaskId, TaskError)>>,

    stopped: Cell<bool>,

    /// Set once the owning `EventLoop` is dropped.
    closed: Cell<bool>,
}

impl Context {
    fn new(builder: &EventLoopBuilder) -> io::Result<Rc<Self>> {
        #[cfg(unix)]
        let io = if builder.io_enabled() {
            Some(RefCell::new(ReadinessTable::new(builder.events_capacity())?))
        } else {
            None
        };

        let cx = Rc::new(Context {
            id: NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed),
            thread: thread::current().id(),
            tasks: RefCell::new(TaskArena::with_capacity(builder.entries())),
            ready: TaskQueue::new_with_capacity(builder.entries()),
            timers: RefCell::new(TimerTable::new()),
            #[cfg(unix)]
            io,
            current: Cell::new(None),
            unobserved: RefCell::new(Vec::new()),
            stopped: Cell::new(false),
            closed: Cell::new(false),
        });
        LOOPS.with(|loops| loops.borrow_mut().insert(cx.id, Rc::downgrade(&cx)));
        Ok(cx)
    }

    pub(crate) fn spawn<F>(self: &Rc<Self>, future: F, root: bool) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        assert!(
            !self.closed.get(),
            "spawn called on an event loop that has been dropped"
        );
        let (entry, promise) = new_task(future, root);
        let id = self.tasks.borrow_mut().insert(entry);
        self.ready.push(id);
        trace!(loop_id = self.id, task = %id, root, "task spawned");
        JoinHandle::new(id, promise, Rc::downgrade(self))
    }

    /// Pushes `id` onto the ready queue unless it is already there.
    pub(crate) fn schedule(&self, id: TaskId) {
        let action = match self.tasks.borrow().get(id) {
            Some(entry) => entry.state.transition_to_notified(),
            None => {
                trace!(loop_id = self.id, task = %id, "wake for a released task ignored");
                return;
            }
        };
        if let TransitionToNotified::Submit = action {
            trace!(loop_id = self.id, task = %id, "task scheduled");
            self.ready.push(id);
        }
    }

    /// Runs one task to its next suspension point or to completion.
    fn run_task(&self, id: TaskId) {
        let mut future = {
            let mut tasks = self.tasks.borrow_mut();
            let entry = match tasks.get_mut(id) {
                Some(entry) => entry,
                None => double_resume_fault(id),
            };
            entry.state.transition_to_running(id);
            entry.reason.set(None);
            match entry.future.take() {
                Some(future) => future,
                None => double_resume_fault(id),
            }
        };

        self.current.set(Some(id));
        let waker = task_waker(self.id, self.thread, id);
        let mut cx = PollContext::from_waker(&waker);
        error::take_fault();
        let polled = catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));
        self.current.set(None);

        match polled {
            Ok(Poll::Pending) => self.suspend(id, future),
            Ok(Poll::Ready(())) => self.complete(id, future, None),
            // Faults raised inside a task's poll are not task failures.
            Err(payload) if error::take_fault() => resume_unwind(payload),
            Err(payload) => self.complete(id, future, Some(TaskError::from_panic(payload))),
        }
    }

    fn suspend(&self, id: TaskId, future: BoxFuture) {
        let (requeue, cancelled) = {
            let mut tasks = self.tasks.borrow_mut();
            let entry = match tasks.get_mut(id) {
                Some(entry) => entry,
                None => return,
            };
            let requeue = matches!(entry.state.transition_to_idle(), TransitionToIdle::OkNotified);
            if entry.cancel_requested {
                let _ = entry.state.transition_to_cancelled();
                (false, Some(future))
            } else {
                entry.future = Some(future);
                (requeue, None)
            }
        };
        if let Some(future) = cancelled {
            debug!(loop_id = self.id, task = %id, "task cancelled itself");
            self.abandon(id, Some(future));
        } else if requeue {
            self.ready.push(id);
        }
    }

    /// The task's future returned `Ready` or panicked.
    fn complete(&self, id: TaskId, future: BoxFuture, failure: Option<TaskError>) {
        // Dropping the future releases whatever it still has registered.
        drop(future);
        let (promise, root) = {
            let tasks = self.tasks.borrow();
            let entry = match tasks.get(id) {
                Some(entry) => entry,
                None => return,
            };
            let _ = entry.state.transition_to_complete();
            (entry.promise.clone(), entry.root)
        };
        if let Some(error) = failure {
            promise.fail(error.clone());
            if !promise.is_joined() {
                if root {
                    self.unobserved.borrow_mut().push((id, error));
                } else {
                    warn!(loop_id = self.id, task = %id, %error, "detached task failed");
                }
            }
        }
        trace!(loop_id = self.id, task = %id, "task finished");
        self.release(id);
    }

    /// Cancels a live task. Returns `false` if it already finished.
    pub(crate) fn cancel(&self, id: TaskId) -> bool {
        let future = {
            let mut tasks = self.tasks.borrow_mut();
            let entry = match tasks.get_mut(id) {
                Some(entry) => entry,
                None => return false,
            };
            let snapshot = entry.state.load();
            if snapshot.is_complete() || snapshot.is_cancelled() || entry.cancel_requested {
                return false;
            }
            if snapshot.is_running() {
                // Honoured once the current poll returns.
                entry.cancel_requested = true;
                debug!(loop_id = self.id, task = %id, "cancellation requested by the running task");
                return true;
            }
            let _ = entry.state.transition_to_cancelled();
            entry.future.take()
        };
        self.ready.remove(id);
        debug!(loop_id = self.id, task = %id, "task cancelled");
        self.abandon(id, future);
        true
    }

    /// Drops a cancelled task without resuming it and settles its promise.
    fn abandon(&self, id: TaskId, future: Option<BoxFuture>) {
        let purged = self.purge_registrations(id);
        drop(purged);
        drop(future);
        let promise = match self.tasks.borrow().get(id) {
            Some(entry) => entry.promise.clone(),
            None => return,
        };
        promise.fail(TaskError::Cancelled);
        self.release(id);
    }

    /// Removes every timer and readiness entry that would resume `id`.
    fn purge_registrations(&self, id: TaskId) -> Vec<Continuation> {
        #[allow(unused_mut)]
        let mut purged = self.timers.borrow_mut().remove_task(id);
        #[cfg(unix)]
        if let Some(io) = &self.io {
            purged.extend(io.borrow_mut().remove_task(id));
        }
        purged
    }

    /// Counts `cont` as a wait on task `target`, and remembers `slot` so the
    /// wait can be dropped if the waiting task goes away first.
    pub(crate) fn track_join(
        self: &Rc<Self>,
        cont: Continuation,
        target: TaskId,
        slot: &Rc<WaiterSlot>,
    ) -> Continuation {
        if let (Some(task), Some(loop_id)) = (cont.task(), cont.loop_id()) {
            if loop_id == self.id {
                if let Some(entry) = self.tasks.borrow().get(task) {
                    let slot = Rc::downgrade(slot);
                    let mut awaiting = entry.awaiting.borrow_mut();
                    awaiting.retain(|w| w.strong_count() > 0);
                    if !awaiting.iter().any(|w| w.ptr_eq(&slot)) {
                        awaiting.push(slot);
                    }
                }
            }
        }
        cont.tracked(self, SuspendReason::Task(target))
    }

    /// Drops the continuations `id` left waiting on other tasks.
    fn forget_waits(&self, id: TaskId) {
        let awaiting = match self.tasks.borrow().get(id) {
            Some(entry) => std::mem::take(&mut *entry.awaiting.borrow_mut()),
            None => return,
        };
        for slot in awaiting.iter().filter_map(Weak::upgrade) {
            slot.forget(id);
        }
    }

    /// Frees the task's arena slot.
    fn release(&self, id: TaskId) {
        self.forget_waits(id);
        let entry = self.tasks.borrow_mut().remove(id);
        if let Some(entry) = entry {
            let registrations = entry.registrations.get();
            if registrations != 0 {
                dangling_registration_fault(id, registrations);
            }
        }
    }

    pub(crate) fn register(&self, task: TaskId) {
        if let Some(entry) = self.tasks.borrow().get(task) {
            entry.registrations.set(entry.registrations.get() + 1);
        }
    }

    pub(crate) fn unregister(&self, task: TaskId) {
        if let Some(entry) = self.tasks.borrow().get(task) {
            entry
                .registrations
                .set(entry.registrations.get().saturating_sub(1));
        }
    }

    pub(crate) fn note_suspension(&self, task: TaskId, reason: SuspendReason) {
        if let Some(entry) = self.tasks.borrow().get(task) {
            entry.reason.set(Some(reason));
        }
    }

    pub(crate) fn task_state(&self, task: TaskId) -> Option<TaskState> {
        self.tasks.borrow().get(task).map(|entry| entry.observe())
    }

    /// Runs exactly the tasks queued when the pass starts. Tasks woken during
    /// the pass wait for the next one.
    fn drain_pass(&self) {
        let budget = self.ready.len();
        for _ in 0..budget {
            if self.stopped.get() {
                break;
            }
            match self.ready.pop() {
                Some(id) => self.run_task(id),
                None => break,
            }
        }
    }

    /// Waits for the next timer or I/O event and resumes what became ready.
    fn park(&self) -> io::Result<()> {
        let timeout = if self.ready.is_empty() {
            self.timers
                .borrow()
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
        } else {
            Some(Duration::ZERO)
        };

        #[cfg(unix)]
        if let Some(io) = &self.io {
            let ready = io.borrow_mut().poll(timeout)?;
            self.fire_timers();
            for cont in ready {
                cont.resume();
            }
            return Ok(());
        }

        // Without I/O a non-idle loop always has a ready task or a timer.
        if let Some(timeout) = timeout {
            if !timeout.is_zero() {
                thread::sleep(timeout);
            }
        }
        self.fire_timers();
        Ok(())
    }

    fn fire_timers(&self) {
        let fired = self.timers.borrow_mut().expire(Instant::now());
        if !fired.is_empty() {
            trace!(loop_id = self.id, count = fired.len(), "timers fired");
        }
        for cont in fired {
            cont.resume();
        }
    }

    fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    fn io_count(&self) -> usize {
        #[cfg(unix)]
        if let Some(io) = &self.io {
            return io.borrow().len();
        }
        0
    }

    fn is_idle(&self) -> bool {
        self.ready.is_empty() && self.timers.borrow().is_empty() && self.io_count() == 0
    }

    fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Drains every unobserved root failure. The first is returned; the rest
    /// are logged.
    fn take_unobserved(&self) -> Option<(TaskId, TaskError)> {
        let mut unobserved = std::mem::take(&mut *self.unobserved.borrow_mut()).into_iter();
        let first = unobserved.next();
        for (task, error) in unobserved {
            warn!(loop_id = self.id, task = %task, %error, "unobserved root task failure");
        }
        first
    }
}

/// Hands a resumed task back to its loop.
pub(crate) fn wake(loop_id: u64, task: TaskId) {
    let cx = LOOPS
        .try_with(|loops| loops.borrow().get(&loop_id).and_then(Weak::upgrade))
        .ok()
        .flatten();
    match cx {
        Some(cx) => cx.schedule(task),
        None => warn!(loop_id, task = %task, "wake for a dropped event loop ignored"),
    }
}

/// The loop and task being polled on this thread, if any.
pub(crate) fn current_task() -> Option<(u64, TaskId)> {
    if !CURRENT.is_set() {
        return None;
    }
    CURRENT.with(|cx| cx.current.get().map(|task| (cx.id, task)))
}

/// A single-threaded cooperative event loop.
///
/// 事件循环：
/// - 拥有所有任务(挂起期间任务的future归循环所有)。
/// - 按先进先出顺序执行就绪任务，每一轮只执行本轮开始时已就绪的任务。
/// - 空闲时阻塞等待最近的定时器或I/O事件。
///
/// Run one loop per thread; loops share nothing.
pub struct EventLoop {
    handle: Handle,
}

impl EventLoop {
    /// Creates a loop with the default configuration.
    pub fn new() -> io::Result<EventLoop> {
        EventLoopBuilder::new().build()
    }

    /// Returns a builder to configure a loop.
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    pub(crate) fn from_builder(builder: &EventLoopBuilder) -> io::Result<EventLoop> {
        let context = Context::new(builder)?;
        debug!(loop_id = context.id, "event loop created");
        Ok(EventLoop {
            handle: Handle { context },
        })
    }

    /// A handle to pass into tasks.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Submits a root task.
    ///
    /// If the task panics and its `JoinHandle` has been dropped, [`run`]
    /// reports the failure once the loop drains. When several roots fail that
    /// way, the first is returned and the others are logged.
    ///
    /// [`run`]: EventLoop::run
    pub fn submit<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.handle.context.spawn(future, true)
    }

    /// Drives the loop until there is no outstanding work, or until
    /// [`Handle::stop`] is called.
    ///
    /// # Panics
    ///
    /// Panics if another loop is already running on this thread.
    pub fn run(&mut self) -> Result<(), Error> {
        assert!(
            !CURRENT.is_set(),
            "Can not start an event loop inside an event loop"
        );
        let cx = &*self.handle.context;
        cx.stopped.set(false);
        debug!(loop_id = cx.id, "event loop running");

        CURRENT.set(cx, || -> Result<(), Error> {
            loop {
                cx.drain_pass();
                if cx.stopped.get() || cx.is_idle() {
                    return Ok(());
                }
                cx.park()?;
            }
        })?;

        debug!(
            loop_id = cx.id,
            pending = cx.pending_tasks(),
            unobserved = cx.unobserved.borrow().len(),
            stopped = cx.stopped.get(),
            "event loop returned"
        );
        match cx.take_unobserved() {
            Some((task, source)) => Err(Error::RootFailed { task, source }),
            None => Ok(()),
        }
    }

    /// Submits `future` as a root task and drives the loop until it settles.
    ///
    /// Other tasks are left as they are when this returns.
    ///
    /// # Panics
    ///
    /// Panics if another loop is already running on this thread.
    pub fn block_on<F>(&mut self, future: F) -> Result<F::Output, Error>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        assert!(
            !CURRENT.is_set(),
            "Can not start an event loop inside an event loop"
        );
        let mut join = self.submit(future);
        let cx = &*self.handle.context;
        cx.stopped.set(false);

        CURRENT.set(cx, || -> Result<(), Error> {
            loop {
                cx.drain_pass();
                if join.is_finished() {
                    return Ok(());
                }
                if cx.stopped.get() {
                    return Err(Error::Stopped);
                }
                if cx.is_idle() {
                    return Err(Error::Stalled {
                        pending: cx.pending_tasks(),
                    });
                }
                cx.park()?;
            }
        })?;

        let task = join.id();
        join.take_result()
            .map_err(|source| Error::RootFailed { task, source })
    }

    /// See [`Handle::register_timer`].
    pub fn register_timer(&self, deadline: Instant, cont: Continuation) -> TimerKey {
        self.handle.register_timer(deadline, cont)
    }

    /// See [`Handle::cancel_timer`].
    pub fn cancel_timer(&self, key: TimerKey) -> bool {
        self.handle.cancel_timer(key)
    }

    /// See [`Handle::register_io`].
    #[cfg(unix)]
    pub fn register_io(
        &self,
        source: RawFd,
        interest: Interest,
        cont: Continuation,
    ) -> io::Result<IoKey> {
        self.handle.register_io(source, interest, cont)
    }

    /// See [`Handle::cancel_io`].
    #[cfg(unix)]
    pub fn cancel_io(&self, key: IoKey) -> bool {
        self.handle.cancel_io(key)
    }

    /// Number of live tasks.
    pub fn pending_tasks(&self) -> usize {
        self.handle.pending_tasks()
    }

    /// Number of pending timers.
    pub fn timer_count(&self) -> usize {
        self.handle.timer_count()
    }

    /// Number of sources with a waiting continuation.
    pub fn io_count(&self) -> usize {
        self.handle.io_count()
    }

    /// Returns `true` when nothing is ready, and no timer or I/O wait is
    /// pending.
    pub fn is_drained(&self) -> bool {
        self.handle.context.is_idle()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let cx = &self.handle.context;
        cx.closed.set(true);
        cx.ready.clear();

        // Futures are dropped outside the arena borrow: their destructors
        // cancel timers and release registrations.
        let entries = cx.tasks.borrow_mut().drain();
        let mut promises = Vec::with_capacity(entries.len());
        for mut entry in entries {
            drop(entry.future.take());
            promises.push(entry.promise);
        }
        for promise in promises {
            promise.fail(TaskError::Cancelled);
        }

        let timers = cx.timers.borrow_mut().clear();
        drop(timers);
        #[cfg(unix)]
        if let Some(io) = &cx.io {
            let waiting = io.borrow_mut().clear();
            drop(waiting);
        }

        let _ = LOOPS.try_with(|loops| loops.borrow_mut().remove(&cx.id));
        debug!(loop_id = cx.id, "event loop dropped");
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.handle, f)
    }
}

/// A cheap, clonable reference to an [`EventLoop`].
///
/// Every async entry point that needs the loop takes a `Handle` explicitly,
/// so several loops can coexist (one per worker thread, or several in one
/// test).
#[derive(Clone)]
pub struct Handle {
    context: Rc<Context>,
}

impl Handle {
    /// Spawns a new asynchronous task, returning a [`JoinHandle`] for it.
    ///
    /// 孵化一个异步任务。丢弃返回的句柄不会终止任务。
    ///
    /// # Panics
    ///
    /// Panics if the loop has been dropped.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.context.spawn(future, false)
    }

    /// Cancels a task. Returns `false` if it already finished.
    pub fn cancel(&self, task: TaskId) -> bool {
        self.context.cancel(task)
    }

    /// Lifecycle state of a live task; `None` once it has been released.
    pub fn task_state(&self, task: TaskId) -> Option<TaskState> {
        self.context.task_state(task)
    }

    /// Waits until `duration` has elapsed.
    pub fn sleep(&self, duration: Duration) -> Sleep {
        crate::time::sleep(self, duration)
    }

    /// Waits until `deadline` is reached.
    pub fn sleep_until(&self, deadline: Instant) -> Sleep {
        crate::time::sleep_until(self, deadline)
    }

    /// Stores `cont` in the timer structure; it is resumed once `deadline`
    /// passes.
    pub fn register_timer(&self, deadline: Instant, cont: Continuation) -> TimerKey {
        let cont = cont.tracked(&self.context, SuspendReason::Timer { deadline });
        let key = self.context.timers.borrow_mut().insert(deadline, cont);
        trace!(loop_id = self.context.id, ?deadline, "timer registered");
        key
    }

    /// Removes a pending timer without resuming it. Returns `false` if it
    /// already fired or was cancelled.
    pub fn cancel_timer(&self, key: TimerKey) -> bool {
        let removed = self.context.timers.borrow_mut().remove(key);
        removed.is_some()
    }

    pub(crate) fn replace_timer(&self, key: TimerKey, cont: Continuation) -> Result<(), Continuation> {
        let cont = cont.tracked(
            &self.context,
            SuspendReason::Timer {
                deadline: key.deadline(),
            },
        );
        let replaced = self.context.timers.borrow_mut().replace(key, cont);
        replaced.map(drop)
    }

    pub(crate) fn timer_pending(&self, key: TimerKey) -> bool {
        self.context.timers.borrow().contains(key)
    }

    /// Stores `cont` in the readiness table; it is resumed once `source` is
    /// ready for `interest`.
    ///
    /// Fails with `ErrorKind::AlreadyExists` if another task is already
    /// waiting on `source`, and with `ErrorKind::Unsupported` if the loop was
    /// built with I/O disabled. `cont` is dropped on failure.
    #[cfg(unix)]
    pub fn register_io(
        &self,
        source: RawFd,
        interest: Interest,
        cont: Continuation,
    ) -> io::Result<IoKey> {
        self.try_register_io(source, interest, cont)
            .map_err(|(error, _)| error)
    }

    /// Like `register_io`, but hands the continuation back on failure.
    #[cfg(unix)]
    pub(crate) fn try_register_io(
        &self,
        source: RawFd,
        interest: Interest,
        cont: Continuation,
    ) -> Result<IoKey, (io::Error, Continuation)> {
        let io = match &self.context.io {
            Some(io) => io,
            None => {
                return Err((
                    io::Error::new(
                        io::ErrorKind::Unsupported,
                        "event loop was built with I/O disabled",
                    ),
                    cont,
                ))
            }
        };
        let cont = cont.tracked(&self.context, SuspendReason::Io { source });
        let registered = io.borrow_mut().register(source, interest, cont);
        match registered {
            Ok((key, replaced)) => {
                drop(replaced);
                trace!(loop_id = self.context.id, source, ?interest, "io registered");
                Ok(key)
            }
            Err(failed) => Err(failed),
        }
    }

    /// Removes a pending readiness wait without resuming it. Returns `false`
    /// if it already fired or was cancelled.
    #[cfg(unix)]
    pub fn cancel_io(&self, key: IoKey) -> bool {
        let removed = match &self.context.io {
            Some(io) => io.borrow_mut().remove(key),
            None => None,
        };
        removed.is_some()
    }

    #[cfg(unix)]
    pub(crate) fn io_pending(&self, key: IoKey) -> bool {
        match &self.context.io {
            Some(io) => io.borrow().contains(key),
            None => false,
        }
    }

    /// Waits until `source` is readable.
    #[cfg(unix)]
    pub fn readable<S: AsRawFd + ?Sized>(&self, source: &S) -> Readiness {
        self.ready(source.as_raw_fd(), Interest::Readable)
    }

    /// Waits until `source` is writable.
    #[cfg(unix)]
    pub fn writable<S: AsRawFd + ?Sized>(&self, source: &S) -> Readiness {
        self.ready(source.as_raw_fd(), Interest::Writable)
    }

    /// Waits until `source` is ready for `interest`.
    #[cfg(unix)]
    pub fn ready(&self, source: RawFd, interest: Interest) -> Readiness {
        Readiness::new(self.clone(), source, interest)
    }

    /// Makes `run` return after the task being polled, leaving every other
    /// task, timer and I/O wait in place.
    pub fn stop(&self) {
        debug!(loop_id = self.context.id, "event loop stop requested");
        self.context.stopped.set(true);
    }

    /// Number of live tasks.
    pub fn pending_tasks(&self) -> usize {
        self.context.pending_tasks()
    }

    /// Number of pending timers.
    pub fn timer_count(&self) -> usize {
        self.context.timer_count()
    }

    /// Number of sources with a waiting continuation.
    pub fn io_count(&self) -> usize {
        self.context.io_count()
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.context.id)
            .field("tasks", &self.context.pending_tasks())
            .field("ready", &self.context.ready.len())
            .field("timers", &self.context.timer_count())
            .field("io", &self.context.io_count())
            .finish()
    }
}
