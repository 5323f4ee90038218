//! A single-threaded cooperative task runtime.
//!
//! One [`EventLoop`] runs many tasks by suspending them at well-defined
//! points and resuming them when a timer fires, a descriptor becomes ready
//! or another task completes. Loops share nothing: run one per thread.
//!
//! ```
//! use std::time::Duration;
//! use strand::{combinator::when_all, EventLoop};
//!
//! let mut el = EventLoop::new().unwrap();
//! let handle = el.handle();
//! let values = el
//!     .block_on(async move {
//!         let tasks = [3u64, 1, 2].map(|n| {
//!             let h = handle.clone();
//!             handle.spawn(async move {
//!                 h.sleep(Duration::from_millis(n)).await;
//!                 n
//!             })
//!         });
//!         when_all(tasks).await.into_result()
//!     })
//!     .unwrap();
//! assert_eq!(values, Ok(vec![3, 1, 2]));
//! ```

#![warn(missing_docs, unreachable_pub)]

pub mod awaiter;
mod builder;
pub mod combinator;
pub mod error;
pub mod generator;
#[cfg(unix)]
pub mod io;
mod runtime;
mod scheduler;
pub mod task;
pub mod time;

pub use awaiter::{suspend, Awaiter, Continuation, Suspend};
pub use builder::EventLoopBuilder;
pub use combinator::{when_all, when_any};
pub use error::{Error, TaskError, TimeoutExpired};
pub use generator::{Co, Generator, GeneratorState};
pub use runtime::{EventLoop, Handle};
pub use task::{yield_now, JoinHandle, SuspendReason, TaskId, TaskState};
