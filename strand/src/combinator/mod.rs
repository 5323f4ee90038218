//! Fan-in combinators over spawned tasks.
//!
//! Neither combinator ever cancels a task on its own. [`when_all`] waits for
//! every task even after one failed, and [`when_any`] hands the tasks that
//! did not win back to the caller, still running. Abandoning them is an
//! explicit [`AnyResult::cancel_remaining`].

mod when_all;
pub use when_all::{when_all, AllResults, WhenAll};

mod when_any;
pub use when_any::{when_any, AnyResult, WhenAny};

use std::cell::{Cell, RefCell};

use crate::awaiter::{Continuation, FanIn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    All,
    Any,
}

/// Shared by the arms of one combinator. Resumes the awaiting continuation
/// exactly once: on the last arrival (`All`) or on the first one (`Any`).
///
/// 汇合门闩：记录各分支的到达顺序。
struct Latch {
    mode: Mode,
    remaining: Cell<usize>,
    order: RefCell<Vec<usize>>,
    parent: RefCell<Option<Continuation>>,
}

impl Latch {
    fn new(mode: Mode, arms: usize) -> Self {
        Latch {
            mode,
            remaining: Cell::new(arms),
            order: RefCell::new(Vec::with_capacity(arms)),
            parent: RefCell::new(None),
        }
    }

    /// Installs the continuation to resume, replacing an earlier one.
    fn set_parent(&self, cont: Continuation) {
        let previous = self.parent.borrow_mut().replace(cont);
        drop(previous);
    }

    /// Indices in the order their tasks settled.
    fn arrivals(&self) -> Vec<usize> {
        self.order.borrow().clone()
    }
}

impl FanIn for Latch {
    fn arrive(&self, index: usize) {
        self.order.borrow_mut().push(index);
        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        let fire = match self.mode {
            Mode::All => remaining == 0,
            Mode::Any => true,
        };
        if fire {
            let parent = self.parent.borrow_mut().take();
            if let Some(parent) = parent {
                parent.resume();
            }
        }
    }
}
