use std::{collections::BTreeMap, time::Instant};

use crate::{awaiter::Continuation, task::TaskId};

/// Handle to a registered timer.
///
/// Keys order by deadline first and registration order second, which is the
/// order timers fire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerKey {
    deadline: Instant,
    seq: u64,
}

impl TimerKey {
    /// When the timer fires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// 定时器结构：按截止时间排序，截止时间相同时按登记顺序排序。
pub(crate) struct TimerTable {
    entries: BTreeMap<TimerKey, Continuation>,
    next_seq: u64,
}

impl TimerTable {
    pub(crate) fn new() -> Self {
        TimerTable {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn insert(&mut self, deadline: Instant, cont: Continuation) -> TimerKey {
        let key = TimerKey {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, cont);
        key
    }

    /// Swaps the continuation of a pending timer, returning the old one.
    /// Gives `cont` back if the timer is no longer pending.
    pub(crate) fn replace(
        &mut self,
        key: TimerKey,
        cont: Continuation,
    ) -> Result<Continuation, Continuation> {
        match self.entries.get_mut(&key) {
            Some(slot) => Ok(std::mem::replace(slot, cont)),
            None => Err(cont),
        }
    }

    pub(crate) fn remove(&mut self, key: TimerKey) -> Option<Continuation> {
        self.entries.remove(&key)
    }

    pub(crate) fn contains(&self, key: TimerKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|key| key.deadline)
    }

    /// Removes every timer due at `now`, in firing order.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<Continuation> {
        let mut fired = Vec::new();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().deadline > now {
                break;
            }
            fired.push(entry.remove());
        }
        fired
    }

    /// Removes every timer whose continuation resumes `task`.
    pub(crate) fn remove_task(&mut self, task: TaskId) -> Vec<Continuation> {
        let keys: Vec<TimerKey> = self
            .entries
            .iter()
            .filter(|(_, cont)| cont.task() == Some(task))
            .map(|(key, _)| *key)
            .collect();
        keys.into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) -> Vec<Continuation> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        rc::Rc,
        task::Context,
        time::Duration,
    };

    use super::*;
    use crate::awaiter::FanIn;

    struct Recorder(RefCell<Vec<usize>>);

    impl FanIn for Recorder {
        fn arrive(&self, index: usize) {
            self.0.borrow_mut().push(index);
        }
    }

    fn arm(recorder: &Rc<Recorder>, index: usize) -> Continuation {
        Continuation::arm(recorder.clone(), index, None, 0)
    }

    #[test]
    fn fires_by_deadline_then_registration() {
        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        let mut table = TimerTable::new();
        let now = Instant::now();
        let later = now + Duration::from_millis(20);

        table.insert(later, arm(&recorder, 0));
        table.insert(now, arm(&recorder, 1));
        table.insert(later, arm(&recorder, 2));
        table.insert(now, arm(&recorder, 3));
        assert_eq!(table.next_deadline(), Some(now));

        for cont in table.expire(now) {
            cont.resume();
        }
        assert_eq!(*recorder.0.borrow(), vec![1, 3]);
        assert_eq!(table.len(), 2);

        for cont in table.expire(later) {
            cont.resume();
        }
        assert_eq!(*recorder.0.borrow(), vec![1, 3, 0, 2]);
        assert!(table.is_empty());
    }

    #[test]
    fn remove_and_replace() {
        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        let mut table = TimerTable::new();
        let key = table.insert(Instant::now(), arm(&recorder, 0));
        assert!(table.contains(key));

        let old = table.replace(key, arm(&recorder, 1)).unwrap();
        drop(old);
        table.remove(key).unwrap().resume();
        assert_eq!(*recorder.0.borrow(), vec![1]);
        assert!(!table.contains(key));
        assert!(table.replace(key, arm(&recorder, 2)).is_err());
    }

    #[test]
    fn remove_by_task() {
        let waker = futures::task::noop_waker();
        let cx = Context::from_waker(&waker);
        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        let task = TaskId::new(3, 1);

        let mut table = TimerTable::new();
        table.insert(Instant::now(), Continuation::arm(recorder.clone(), 0, Some(task), 0));
        table.insert(Instant::now(), Continuation::new(&cx));
        assert_eq!(table.remove_task(task).len(), 1);
        assert_eq!(table.len(), 1);
    }
}
