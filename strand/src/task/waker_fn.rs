use core::task::{RawWaker, RawWakerVTable, Waker};

/// Creates a waker that does nothing.
///
/// 创建一个空唤醒器。生成器由其消费者同步驱动，不需要事件循环唤醒，因此用它来构造`poll`所需的上下文。
///
/// This `Waker` is useful for polling a `Future` to check whether it is
/// `Ready`, without doing any additional work.
pub(crate) fn dummy_waker() -> Waker {
    fn raw_waker() -> RawWaker {
        // the pointer is never dereferenced, so null is ok
        RawWaker::new(std::ptr::null::<()>(), vtable())
    }

    fn vtable() -> &'static RawWakerVTable {
        &RawWakerVTable::new(|_| raw_waker(), |_| {}, |_| {}, |_| {})
    }

    unsafe { Waker::from_raw(raw_waker()) }
}
