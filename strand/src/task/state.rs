use std::{cell::Cell, fmt};

use super::TaskId;
use crate::error::double_resume_fault;

/// 任务状态位序列。
///
/// Tasks never leave their loop's thread, so a plain `Cell` is enough.
pub(crate) struct State(Cell<usize>);

/// Current state value
///
/// 任务状态位序列快照，用作状态临时值。
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot(usize);

/// The task is currently being polled.
const RUNNING: usize = 0b0001;

/// The task's future returned `Ready` or panicked.
///
/// Once this bit is set, it is never unset.
const COMPLETE: usize = 0b0010;

/// Flag tracking if the task has been pushed into the ready queue.
///
/// 任务外在状态：已插入就绪队列。
const NOTIFIED: usize = 0b0100;

/// The task has been polled at least once.
const STARTED: usize = 0b1000;

/// The task was cancelled. Like `COMPLETE`, it is never unset.
#[allow(clippy::unusual_byte_groupings)]
const CANCELLED: usize = 0b1_0000;

/// A task is created sitting in the ready queue.
const INITIAL_STATE: usize = NOTIFIED;

#[must_use]
pub(crate) enum TransitionToIdle {
    Ok,
    OkNotified,
}

#[must_use]
pub(crate) enum TransitionToNotified {
    DoNothing,
    Submit,
}

impl State {
    /// 创建初始状态。
    pub(crate) fn new() -> Self {
        State(Cell::new(INITIAL_STATE))
    }

    /// 当前状态快照。
    pub(crate) fn load(&self) -> Snapshot {
        Snapshot(self.0.get())
    }

    /// Transition the lifecycle to `Running`. Clears the notified bit so wakes
    /// during the poll can be detected.
    ///
    /// Popping a task that is not notified, already running or finished means
    /// the same continuation reached the ready queue twice.
    pub(crate) fn transition_to_running(&self, id: TaskId) {
        let mut curr = self.load();
        if !curr.is_notified() || !curr.is_idle() || curr.is_cancelled() {
            double_resume_fault(id);
        }
        curr.set_running();
        curr.set_started();
        curr.unset_notified();
        self.0.set(curr.0);
    }

    /// Transitions the task from `Running` -> `Idle`.
    ///
    /// 如果执行期间被唤醒过(已通知)，则返回OkNotified，调用方需要把任务重新放回就绪队列。
    pub(crate) fn transition_to_idle(&self) -> TransitionToIdle {
        let mut curr = self.load();
        debug_assert!(curr.is_running());
        curr.unset_running();
        self.0.set(curr.0);
        if curr.is_notified() {
            TransitionToIdle::OkNotified
        } else {
            TransitionToIdle::Ok
        }
    }

    /// Transitions the task from `Running` -> `Complete`.
    pub(crate) fn transition_to_complete(&self) -> Snapshot {
        let mut curr = self.load();
        debug_assert!(curr.is_running());
        debug_assert!(!curr.is_complete());
        curr.unset_running();
        curr.unset_notified();
        curr.0 |= COMPLETE;
        self.0.set(curr.0);
        curr
    }

    /// Marks the task cancelled. Returns `false` if it already finished.
    pub(crate) fn transition_to_cancelled(&self) -> bool {
        let mut curr = self.load();
        if curr.is_complete() || curr.is_cancelled() {
            return false;
        }
        curr.unset_notified();
        curr.0 |= CANCELLED;
        self.0.set(curr.0);
        true
    }

    /// Transitions the state to `NOTIFIED`.
    ///
    /// 状态变更为已通知。返回状态指示是否需要执行提交队列操作：
    /// - 执行中：只打标记，等执行完毕后由运行时重新入队。
    /// - 已完成、已取消或已通知：什么都不做。
    /// - 其它(空闲)：打标记并入队。
    pub(crate) fn transition_to_notified(&self) -> TransitionToNotified {
        let mut curr = self.load();
        let action = if curr.is_running() {
            curr.set_notified();
            TransitionToNotified::DoNothing
        } else if curr.is_complete() || curr.is_cancelled() || curr.is_notified() {
            TransitionToNotified::DoNothing
        } else {
            curr.set_notified();
            TransitionToNotified::Submit
        };
        self.0.set(curr.0);
        action
    }
}

impl Snapshot {
    /// 空闲状态判断：非执行中、非已完成。
    pub(crate) fn is_idle(self) -> bool {
        self.0 & (RUNNING | COMPLETE) == 0
    }

    pub(crate) fn is_notified(self) -> bool {
        self.0 & NOTIFIED == NOTIFIED
    }

    fn unset_notified(&mut self) {
        self.0 &= !NOTIFIED
    }

    fn set_notified(&mut self) {
        self.0 |= NOTIFIED
    }

    pub(crate) fn is_running(self) -> bool {
        self.0 & RUNNING == RUNNING
    }

    fn set_running(&mut self) {
        self.0 |= RUNNING;
    }

    fn unset_running(&mut self) {
        self.0 &= !RUNNING;
    }

    pub(crate) fn is_started(self) -> bool {
        self.0 & STARTED == STARTED
    }

    fn set_started(&mut self) {
        self.0 |= STARTED;
    }

    /// Returns `true` if the task's future has completed execution.
    pub(crate) fn is_complete(self) -> bool {
        self.0 & COMPLETE == COMPLETE
    }

    pub(crate) fn is_cancelled(self) -> bool {
        self.0 & CANCELLED == CANCELLED
    }
}

impl fmt::Debug for State {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.load();
        snapshot.fmt(fmt)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Snapshot")
            .field("is_running", &self.is_running())
            .field("is_complete", &self.is_complete())
            .field("is_notified", &self.is_notified())
            .field("is_started", &self.is_started())
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> TaskId {
        TaskId::new(0, 0)
    }

    #[test]
    fn lifecycle() {
        let state = State::new();
        assert!(state.load().is_notified());
        assert!(!state.load().is_started());

        state.transition_to_running(id());
        assert!(state.load().is_running());
        assert!(state.load().is_started());

        // A wake while running is deferred until the poll returns.
        assert!(matches!(
            state.transition_to_notified(),
            TransitionToNotified::DoNothing
        ));
        assert!(matches!(
            state.transition_to_idle(),
            TransitionToIdle::OkNotified
        ));

        state.transition_to_running(id());
        assert!(matches!(state.transition_to_idle(), TransitionToIdle::Ok));
        assert!(matches!(
            state.transition_to_notified(),
            TransitionToNotified::Submit
        ));
        assert!(matches!(
            state.transition_to_notified(),
            TransitionToNotified::DoNothing
        ));

        state.transition_to_running(id());
        let snapshot = state.transition_to_complete();
        assert!(snapshot.is_complete());
        assert!(!state.transition_to_cancelled());
        assert!(matches!(
            state.transition_to_notified(),
            TransitionToNotified::DoNothing
        ));
    }

    #[test]
    fn cancel_idle() {
        let state = State::new();
        assert!(state.transition_to_cancelled());
        assert!(!state.transition_to_cancelled());
        assert!(state.load().is_cancelled());
    }

    #[test]
    #[should_panic(expected = "double resume fault")]
    fn running_without_notification() {
        let state = State::new();
        state.transition_to_running(id());
        let _ = state.transition_to_idle();
        state.transition_to_running(id());
    }
}
