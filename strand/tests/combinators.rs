use std::{
    rc::Rc,
    cell::RefCell,
    time::{Duration, Instant},
};

use strand::{
    combinator::{when_all, when_any},
    EventLoop, Handle, JoinHandle, SuspendReason, TaskError, TaskState,
};

const UNIT: Duration = Duration::from_millis(20);

fn sleeper<T: 'static>(handle: &Handle, units: u32, value: T) -> JoinHandle<T> {
    let h = handle.clone();
    handle.spawn(async move {
        h.sleep(UNIT * units).await;
        value
    })
}

#[test]
fn when_all_is_position_stable() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let start = Instant::now();

    let results = el
        .block_on(async move {
            let t1 = sleeper(&handle, 2, "r1");
            let t2 = sleeper(&handle, 1, "r2");
            when_all([t1, t2]).await
        })
        .unwrap();

    assert!(start.elapsed() >= UNIT * 2);
    assert_eq!(results.len(), 2);
    assert!(results.first_failure().is_none());
    assert_eq!(results.into_result(), Ok(vec!["r1", "r2"]));
}

#[test]
fn when_all_end_to_end_keeps_submission_order() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let finished = Rc::new(RefCell::new(Vec::new()));

    let order = finished.clone();
    let results = el
        .block_on(async move {
            let tasks: Vec<_> = [3u32, 1, 2]
                .into_iter()
                .map(|units| {
                    let h = handle.clone();
                    let order = order.clone();
                    handle.spawn(async move {
                        h.sleep(UNIT * units).await;
                        order.borrow_mut().push(units);
                        format!("result{units}")
                    })
                })
                .collect();
            when_all(tasks).await
        })
        .unwrap();

    assert_eq!(*finished.borrow(), vec![1, 2, 3]);
    let values: Vec<String> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(values, vec!["result3", "result1", "result2"]);
}

#[test]
fn when_all_records_first_failure_without_cancelling() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();

    let results = el
        .block_on(async move {
            let slow = {
                let h = handle.clone();
                handle.spawn(async move {
                    h.sleep(UNIT * 2).await;
                    panic!("slow failure");
                })
            };
            let fast = {
                let h = handle.clone();
                handle.spawn(async move {
                    h.sleep(UNIT).await;
                    panic!("fast failure");
                })
            };
            let survivor = sleeper(&handle, 3, ());
            when_all([slow, fast, survivor]).await
        })
        .unwrap();

    let (index, error) = results.first_failure().unwrap();
    assert_eq!(index, 1);
    assert_eq!(error, &TaskError::Panicked("fast failure".into()));
    // The sibling that had not failed ran to completion.
    assert_eq!(results[2], Ok(()));
    assert_eq!(
        results.into_result(),
        Err(TaskError::Panicked("fast failure".into()))
    );
}

#[test]
fn when_all_of_finished_tasks_does_not_suspend() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let results = el
        .block_on(async move {
            let tasks = [handle.spawn(async { 1 }), handle.spawn(async { 2 })];
            handle.sleep(UNIT).await;
            when_all(tasks).await
        })
        .unwrap();
    assert_eq!(results.into_vec(), vec![Ok(1), Ok(2)]);
}

#[test]
fn when_all_of_nothing() {
    let mut el = EventLoop::new().unwrap();
    let results = el
        .block_on(when_all(Vec::<JoinHandle<()>>::new()))
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn when_any_leaves_the_losers_running() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let start = Instant::now();

    let outcome = el
        .block_on({
            let handle = handle.clone();
            async move {
                let t1 = sleeper(&handle, 1, "r1");
                let t2 = sleeper(&handle, 5, "r2");
                when_any([t1, t2]).await
            }
        })
        .unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= UNIT && elapsed < UNIT * 4);
    assert_eq!(outcome.index, 0);
    assert_eq!(outcome.result, Ok("r1"));

    // Stopped right away: t2 is still pending, not silently cancelled.
    assert_eq!(outcome.remaining.len(), 1);
    let (index, t2) = &outcome.remaining[0];
    assert_eq!(*index, 1);
    assert!(matches!(
        t2.state(),
        TaskState::Suspended(SuspendReason::Timer { .. })
    ));
    assert_eq!(el.pending_tasks(), 1);
    assert_eq!(el.timer_count(), 1);

    assert_eq!(outcome.cancel_remaining(), 1);
    assert_eq!(el.pending_tasks(), 0);
    assert_eq!(el.timer_count(), 0);
    assert!(el.is_drained());
    drop(handle);
}

#[test]
fn when_any_losers_can_still_be_awaited() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();

    let (first, second) = el
        .block_on(async move {
            let t1 = sleeper(&handle, 2, 2);
            let t2 = sleeper(&handle, 1, 1);
            let outcome = when_any([t1, t2]).await;
            let first = (outcome.index, outcome.result.unwrap());
            let (index, rest) = outcome.remaining.into_iter().next().unwrap();
            (first, (index, rest.await.unwrap()))
        })
        .unwrap();

    assert_eq!(first, (1, 1));
    assert_eq!(second, (0, 2));
}

#[test]
fn when_any_reports_a_failure_as_the_winner() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let outcome = el
        .block_on(async move {
            let failing = handle.spawn(async {
                panic!("first");
            });
            let slow = sleeper(&handle, 1, ());
            when_any([failing, slow]).await
        })
        .unwrap();
    assert_eq!(outcome.index, 0);
    assert!(outcome.result.unwrap_err().is_panic());
}

#[test]
#[should_panic(expected = "when_any called with no tasks")]
fn when_any_of_nothing_panics() {
    let _ = when_any(Vec::<JoinHandle<()>>::new());
}
