#![cfg(unix)]

use std::{
    io::{ErrorKind, Read, Write},
    os::unix::{io::AsRawFd, net::UnixStream},
    time::{Duration, Instant},
};

use strand::{
    io::Interest, Continuation, EventLoop, SuspendReason, TaskError, TaskState,
};

const UNIT: Duration = Duration::from_millis(20);

fn pair() -> (UnixStream, UnixStream) {
    let (a, b) = UnixStream::pair().unwrap();
    a.set_nonblocking(true).unwrap();
    b.set_nonblocking(true).unwrap();
    (a, b)
}

#[test]
fn readable_resumes_once_data_arrives() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let (mut writer, mut reader) = pair();
    let start = Instant::now();

    let writer_handle = handle.clone();
    el.submit(async move {
        writer_handle.sleep(UNIT).await;
        writer.write_all(b"ping").unwrap();
    });

    let received = el
        .block_on(async move {
            let mut buf = [0u8; 16];
            loop {
                match reader.read(&mut buf) {
                    Ok(n) => return buf[..n].to_vec(),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        handle.readable(&reader).await.unwrap();
                    }
                    Err(e) => panic!("read failed: {e}"),
                }
            }
        })
        .unwrap();

    assert_eq!(received, b"ping");
    assert!(start.elapsed() >= UNIT);
    assert_eq!(el.io_count(), 0);
}

#[test]
fn writable_is_ready_immediately_on_an_empty_socket() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let (a, _b) = pair();
    el.block_on(async move { handle.writable(&a).await }).unwrap().unwrap();
}

#[test]
fn one_waiter_per_source() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let (mut writer, reader) = pair();
    let fd = reader.as_raw_fd();

    let first = {
        let h = handle.clone();
        handle.spawn(async move { h.ready(fd, Interest::Readable).await })
    };
    let second = {
        let h = handle.clone();
        handle.spawn(async move { h.ready(fd, Interest::Readable).await })
    };

    let (first, second) = el
        .block_on(async move {
            let second = second.await.unwrap();
            writer.write_all(b"x").unwrap();
            let first = first.await.unwrap();
            (first, second)
        })
        .unwrap();

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err().kind(), ErrorKind::AlreadyExists);
    drop(reader);
}

#[test]
fn cancelling_an_io_wait_removes_it() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let (_writer, reader) = pair();

    let result = el
        .block_on(async move {
            let h = handle.clone();
            let task = handle.spawn(async move { h.readable(&reader).await });
            handle.sleep(UNIT).await;
            assert_eq!(handle.io_count(), 1);
            assert!(matches!(
                task.state(),
                TaskState::Suspended(SuspendReason::Io { .. })
            ));
            task.cancel();
            assert_eq!(handle.io_count(), 0);
            task.await
        })
        .unwrap();

    assert_eq!(result.unwrap_err(), TaskError::Cancelled);
    assert!(el.is_drained());
}

#[test]
fn register_io_on_a_loop_without_io() {
    let el = EventLoop::builder().enable_io(false).build().unwrap();
    let (_a, b) = pair();
    let waker = futures::task::noop_waker();
    let cx = std::task::Context::from_waker(&waker);
    let err = el
        .register_io(b.as_raw_fd(), Interest::Readable, Continuation::new(&cx))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn run_waits_for_pending_io() {
    let mut el = EventLoop::new().unwrap();
    let handle = el.handle();
    let (mut writer, reader) = pair();

    let h = handle.clone();
    let reader_task = el.submit(async move { h.readable(&reader).await.is_ok() });
    el.submit(async move {
        handle.sleep(UNIT).await;
        writer.write_all(b"done").unwrap();
    });

    el.run().unwrap();
    assert_eq!(reader_task.state(), TaskState::Completed);
    assert!(el.is_drained());
}
