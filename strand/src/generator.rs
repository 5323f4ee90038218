//! Lazy, forward-only sequences written as `async` bodies.
//!
//! A [`Generator`] is driven by its consumer through [`Generator::advance`],
//! not by an event loop. Its body suspends only at [`Co::yield_`]; awaiting
//! anything else inside it is a bug and panics.
//!
//! ```
//! use strand::generator::Generator;
//!
//! let mut counter = Generator::new(|co| async move {
//!     for i in 0..3 {
//!         co.yield_(i).await;
//!     }
//! });
//! assert_eq!(counter.advance(), Some(0));
//! assert_eq!(counter.by_ref().collect::<Vec<_>>(), vec![1, 2]);
//! assert_eq!(counter.advance(), None);
//! ```

use std::{
    cell::Cell,
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use crate::task::waker_fn::dummy_waker;

/// Where a generator is in its single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Not advanced yet.
    Created,
    /// Stopped at a yield point.
    Suspended,
    /// The body returned. Every further `advance` returns `None`.
    Complete,
}

/// 生成器：单次、只进的惰性序列。重新开始需要用同一个工厂函数构造新的生成器。
pub struct Generator<'a, T> {
    body: Option<Pin<Box<dyn Future<Output = ()> + 'a>>>,
    slot: Rc<Cell<Option<T>>>,
    state: GeneratorState,
}

impl<'a, T: 'a> Generator<'a, T> {
    /// Builds a generator from a factory producing its body.
    ///
    /// The body does not start running until the first [`advance`].
    ///
    /// [`advance`]: Generator::advance
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(Co<T>) -> Fut,
        Fut: Future<Output = ()> + 'a,
    {
        let slot = Rc::new(Cell::new(None));
        let co = Co { slot: slot.clone() };
        Generator {
            body: Some(Box::pin(factory(co))),
            slot,
            state: GeneratorState::Created,
        }
    }
}

impl<'a, T> Generator<'a, T> {
    /// Runs the body to its next yield and returns the yielded value, or
    /// `None` once the body has returned.
    ///
    /// # Panics
    ///
    /// Panics if the body suspends on anything other than [`Co::yield_`].
    pub fn advance(&mut self) -> Option<T> {
        let body = self.body.as_mut()?;
        let waker = dummy_waker();
        let mut cx = Context::from_waker(&waker);
        match body.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                self.body = None;
                self.state = GeneratorState::Complete;
                None
            }
            Poll::Pending => match self.slot.take() {
                Some(value) => {
                    self.state = GeneratorState::Suspended;
                    Some(value)
                }
                None => panic!("generator body suspended without yielding a value"),
            },
        }
    }

    /// The generator's state.
    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Returns `true` once the body has returned.
    pub fn is_complete(&self) -> bool {
        self.state == GeneratorState::Complete
    }
}

impl<T> Iterator for Generator<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.advance()
    }
}

impl<T> fmt::Debug for Generator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("state", &self.state)
            .finish()
    }
}

/// The yielding side of a [`Generator`], handed to its body.
pub struct Co<T> {
    slot: Rc<Cell<Option<T>>>,
}

impl<T> Co<T> {
    /// Hands `value` to the consumer and suspends until the next
    /// [`Generator::advance`].
    pub fn yield_(&self, value: T) -> Yield<T> {
        Yield {
            slot: self.slot.clone(),
            value: Some(value),
        }
    }
}

impl<T> fmt::Debug for Co<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Co").finish()
    }
}

/// Future returned by [`Co::yield_`].
#[must_use = "a yielded value is only handed over when the yield is awaited"]
pub struct Yield<T> {
    slot: Rc<Cell<Option<T>>>,
    value: Option<T>,
}

impl<T> Unpin for Yield<T> {}

impl<T> Future for Yield<T> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.value.take() {
            Some(value) => {
                self.slot.set(Some(value));
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

impl<T> fmt::Debug for Yield<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Yield")
            .field("pending", &self.value.is_some())
            .finish()
    }
}
