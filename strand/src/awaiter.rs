//! The suspension contract.
//!
//! An [`Awaiter`] either reports that its result is ready, or stores a
//! [`Continuation`] and promises to resume it exactly once later. Every
//! awaiter in this crate (sleeping, joining tasks, I/O readiness, the fan-in
//! combinators) is written against this trait and exposed as a `Future`
//! through [`poll_awaiter`].
//!
//! 挂起契约：
//! - `is_ready`：是否无需挂起即可取结果。
//! - `register_continuation`：未就绪时登记续体，之后恰好恢复一次。
//! - `take_result`：恢复后取一次结果。

use std::{
    fmt,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll, Waker},
};

use crate::{
    runtime::{self, Context as LoopContext},
    task::{SuspendReason, TaskId},
};

/// Something that can be waited on.
pub trait Awaiter {
    /// What the wait produces.
    type Output;

    /// Returns `true` if the result can be taken without suspending.
    fn is_ready(&self) -> bool;

    /// Stores `cont` so it can be resumed once the result is available.
    ///
    /// Called only when [`is_ready`](Awaiter::is_ready) returned `false`.
    /// Registering again replaces the previously stored continuation.
    fn register_continuation(&mut self, cont: Continuation);

    /// Takes the result. Called once, after readiness was observed.
    fn take_result(&mut self) -> Self::Output;
}

/// Runs the awaiter protocol for one `poll`.
pub fn poll_awaiter<A>(awaiter: &mut A, cx: &mut Context<'_>) -> Poll<A::Output>
where
    A: Awaiter + ?Sized,
{
    if awaiter.is_ready() {
        return Poll::Ready(awaiter.take_result());
    }
    awaiter.register_continuation(Continuation::new(cx));
    Poll::Pending
}

/// Adapts any [`Awaiter`] into a `Future`.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Suspend<A> {
    awaiter: A,
}

/// Wraps `awaiter` so it can be `.await`ed.
pub fn suspend<A: Awaiter + Unpin>(awaiter: A) -> Suspend<A> {
    Suspend { awaiter }
}

impl<A> Suspend<A> {
    /// Returns the wrapped awaiter.
    pub fn into_inner(self) -> A {
        self.awaiter
    }
}

impl<A: Awaiter + Unpin> Future for Suspend<A> {
    type Output = A::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<A::Output> {
        poll_awaiter(&mut self.get_mut().awaiter, cx)
    }
}

/// Receives arrivals of the arms of a fan-in combinator.
pub(crate) trait FanIn {
    fn arrive(&self, index: usize);
}

enum Target {
    Waker(Waker),
    Arm { fan_in: Rc<dyn FanIn>, index: usize },
}

/// Counts a stored continuation against its task until it is resumed or
/// dropped.
struct Ticket {
    context: Weak<LoopContext>,
    task: TaskId,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if let Some(cx) = self.context.upgrade() {
            cx.unregister(self.task);
        }
    }
}

/// "The rest of a suspended computation".
///
/// Resuming consumes the continuation, so a single registration can never
/// resume its task twice. Dropping it without resuming abandons the wait.
///
/// 续体：代表某个挂起点之后的剩余计算。不可克隆，恢复即消耗。
pub struct Continuation {
    target: Target,
    owner: Option<(u64, TaskId)>,
    ticket: Option<Ticket>,
}

impl Continuation {
    /// Captures the continuation of the computation being polled with `cx`.
    pub fn new(cx: &Context<'_>) -> Self {
        Continuation {
            target: Target::Waker(cx.waker().clone()),
            owner: runtime::current_task(),
            ticket: None,
        }
    }

    pub(crate) fn arm(fan_in: Rc<dyn FanIn>, index: usize, task: Option<TaskId>, loop_id: u64) -> Self {
        Continuation {
            target: Target::Arm { fan_in, index },
            owner: task.map(|task| (loop_id, task)),
            ticket: None,
        }
    }

    /// The task this continuation resumes, if it was captured inside one.
    pub fn task(&self) -> Option<TaskId> {
        self.owner.map(|(_, task)| task)
    }

    pub(crate) fn loop_id(&self) -> Option<u64> {
        self.owner.map(|(id, _)| id)
    }

    /// Hands the continuation back to its event loop.
    pub fn resume(self) {
        let Continuation { target, ticket, .. } = self;
        drop(ticket);
        match target {
            Target::Waker(waker) => waker.wake(),
            Target::Arm { fan_in, index } => fan_in.arrive(index),
        }
    }

    /// Counts this continuation as a registration of its task in `cx`, and
    /// records why the task is suspended.
    pub(crate) fn tracked(mut self, cx: &Rc<LoopContext>, reason: SuspendReason) -> Self {
        let task = match self.owner {
            Some((loop_id, task)) if loop_id == cx.id => task,
            _ => return self,
        };
        if self.ticket.is_none() {
            cx.register(task);
            self.ticket = Some(Ticket {
                context: Rc::downgrade(cx),
                task,
            });
        }
        cx.note_suspension(task, reason);
        self
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            Target::Waker(_) => "waker",
            Target::Arm { .. } => "fan-in",
        };
        f.debug_struct("Continuation")
            .field("task", &self.task())
            .field("target", &target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Flag {
        ready: Rc<Cell<bool>>,
        stored: Option<Continuation>,
    }

    impl Awaiter for Flag {
        type Output = &'static str;

        fn is_ready(&self) -> bool {
            self.ready.get()
        }

        fn register_continuation(&mut self, cont: Continuation) {
            self.stored = Some(cont);
        }

        fn take_result(&mut self) -> &'static str {
            "ready"
        }
    }

    #[test]
    fn protocol() {
        let ready = Rc::new(Cell::new(false));
        let mut flag = suspend(Flag {
            ready: ready.clone(),
            stored: None,
        });
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut flag).poll(&mut cx).is_pending());
        let cont = flag.awaiter.stored.take().unwrap();
        assert_eq!(cont.task(), None);

        ready.set(true);
        cont.resume();
        assert_eq!(Pin::new(&mut flag).poll(&mut cx), Poll::Ready("ready"));
    }
}
