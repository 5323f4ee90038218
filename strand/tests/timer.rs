use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, Instant},
};

use strand::{
    time::{sleep, timeout},
    EventLoop, SuspendReason, TaskError, TaskState, TimeoutExpired,
};

const UNIT: Duration = Duration::from_millis(20);

#[test]
fn sleep_waits_at_least_its_duration() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let start = Instant::now();
    el.block_on(async move { handle.sleep(UNIT * 2).await })
        .unwrap();
    assert!(start.elapsed() >= UNIT * 2);
    assert_eq!(el.timer_count(), 0);
}

#[test]
fn sleep_zero_resumes_on_a_later_pass() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let log = Rc::new(RefCell::new(Vec::new()));

    let a_log = log.clone();
    el.submit(async move {
        a_log.borrow_mut().push("a-before");
        sleep(&handle, Duration::ZERO).await;
        a_log.borrow_mut().push("a-after");
    });
    let b_log = log.clone();
    el.submit(async move { b_log.borrow_mut().push("b") });

    el.run().unwrap();
    assert_eq!(*log.borrow(), vec!["a-before", "b", "a-after"]);
}

#[test]
fn equal_deadlines_fire_in_registration_order() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let log = Rc::new(RefCell::new(Vec::new()));
    let deadline = Instant::now() + UNIT;

    for i in 0..4 {
        let h = handle.clone();
        let log = log.clone();
        el.submit(async move {
            h.sleep_until(deadline).await;
            log.borrow_mut().push(i);
        });
    }
    el.run().unwrap();
    assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn dropping_a_sleep_cancels_its_timer() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let start = Instant::now();
    el.block_on(async move {
        let long = handle.sleep(UNIT * 50);
        let mut long = std::pin::pin!(long);
        // Poll it once so the timer is registered.
        futures::future::select(long.as_mut(), handle.sleep(UNIT)).await;
        assert_eq!(handle.timer_count(), 1);
    })
    .unwrap();
    assert_eq!(el.timer_count(), 0);
    assert!(start.elapsed() < UNIT * 10);
}

#[test]
fn timeout_expires() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let start = Instant::now();
    let result = el
        .block_on(async move {
            let h = handle.clone();
            timeout(&handle, UNIT, async move {
                h.sleep(UNIT * 50).await;
                "late"
            })
            .await
        })
        .unwrap();
    assert_eq!(result, Err(TimeoutExpired));
    assert!(start.elapsed() < UNIT * 10);
    assert!(el.is_drained());
}

#[test]
fn timeout_passes_through_the_value() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let result = el
        .block_on(async move {
            let h = handle.clone();
            timeout(&handle, UNIT * 10, async move {
                h.sleep(UNIT).await;
                5
            })
            .await
        })
        .unwrap();
    assert_eq!(result, Ok(5));
    assert_eq!(el.timer_count(), 0);
}

#[test]
fn loop_without_io_parks_on_timers() {
    let mut el = EventLoop::builder().enable_io(false).build().unwrap();
    let handle = el.handle();
    let start = Instant::now();
    el.block_on(async move { handle.sleep(UNIT).await }).unwrap();
    assert!(start.elapsed() >= UNIT);
}

#[test]
fn unbounded_sleep_can_be_cancelled() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let sleeper = handle.clone();
    let task = el.submit(async move { sleeper.sleep(Duration::MAX).await });
    let start = Instant::now();
    let result = el
        .block_on(async move {
            handle.sleep(UNIT).await;
            assert!(matches!(
                task.state(),
                TaskState::Suspended(SuspendReason::Timer { .. })
            ));
            assert!(task.cancel());
            task.await
        })
        .unwrap();
    assert_eq!(result, Err(TaskError::Cancelled));
    assert_eq!(el.timer_count(), 0);
    assert!(el.is_drained());
    assert!(start.elapsed() < UNIT * 10);
}

#[test]
fn unbounded_timeout_passes_through_the_value() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let result = el
        .block_on(async move { timeout(&handle, Duration::MAX, async { 3 }).await })
        .unwrap();
    assert_eq!(result, Ok(3));
}
