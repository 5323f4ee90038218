use std::{
    task::{RawWaker, RawWakerVTable, Waker},
    thread::{self, ThreadId},
};

use super::TaskId;

/// 唤醒器携带的数据：所属事件循环、所属线程和任务编号。
///
/// Only plain values live here, so cloning or dropping a waker on any thread
/// is sound. Waking is only allowed on the loop's own thread.
#[derive(Clone, Copy)]
struct WakerData {
    loop_id: u64,
    thread: ThreadId,
    task: TaskId,
}

static VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_waker, wake_by_val, wake_by_ref, drop_waker);

/// Creates the waker the loop passes to a task's `poll`.
pub(crate) fn task_waker(loop_id: u64, thread: ThreadId, task: TaskId) -> Waker {
    let data = WakerData {
        loop_id,
        thread,
        task,
    };
    unsafe { Waker::from_raw(raw_waker(data)) }
}

fn raw_waker(data: WakerData) -> RawWaker {
    let ptr = Box::into_raw(Box::new(data)) as *const ();
    RawWaker::new(ptr, &VTABLE)
}

/// 虚表方法：克隆唤醒器
unsafe fn clone_waker(ptr: *const ()) -> RawWaker {
    let data = *(ptr as *const WakerData);
    raw_waker(data)
}

/// 虚表方法：按值唤醒
unsafe fn wake_by_val(ptr: *const ()) {
    let data = Box::from_raw(ptr as *mut WakerData);
    wake(*data);
}

/// 虚表方法：按引用唤醒
unsafe fn wake_by_ref(ptr: *const ()) {
    wake(*(ptr as *const WakerData));
}

/// 虚表方法：遗弃唤醒器
unsafe fn drop_waker(ptr: *const ()) {
    drop(Box::from_raw(ptr as *mut WakerData));
}

fn wake(data: WakerData) {
    // Loops share nothing; crossing threads needs an explicit channel.
    assert!(
        data.thread == thread::current().id(),
        "{} woken from outside its event loop thread",
        data.task
    );
    crate::runtime::wake(data.loop_id, data.task);
}
