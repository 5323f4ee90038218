use std::{cell::RefCell, collections::VecDeque, marker::PhantomData};

use crate::task::TaskId;

/// 本地就绪队列
///
/// - 事件循环逐个弹出任务编号并执行对应任务。
/// - 先进先出：入队顺序即执行顺序。
/// - 任务是否已在队列中由任务状态的`NOTIFIED`位保证，队列本身不去重。
pub(crate) struct TaskQueue {
    // Local queue.
    queue: RefCell<VecDeque<TaskId>>,
    // Make sure the type is `!Send` and `!Sync`.
    _marker: PhantomData<*const ()>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    /// 新建队列
    ///
    /// 预分配长度4096.
    pub(crate) fn new() -> Self {
        const DEFAULT_TASK_QUEUE_SIZE: usize = 4096;
        Self::new_with_capacity(DEFAULT_TASK_QUEUE_SIZE)
    }

    /// 新建队列
    ///
    /// 自定义预分配长度。
    pub(crate) fn new_with_capacity(capacity: usize) -> Self {
        Self {
            queue: RefCell::new(VecDeque::with_capacity(capacity)),
            _marker: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push(&self, task: TaskId) {
        self.queue.borrow_mut().push_back(task);
    }

    pub(crate) fn pop(&self) -> Option<TaskId> {
        self.queue.borrow_mut().pop_front()
    }

    /// Drops `task` from the queue. Returns `true` if it was queued.
    pub(crate) fn remove(&self, task: TaskId) -> bool {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|queued| *queued != task);
        queue.len() != before
    }

    pub(crate) fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}
