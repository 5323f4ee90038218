//! Generational slot arena holding every live task of a loop.

use super::{TaskEntry, TaskId};

struct Slot {
    generation: u32,
    entry: Option<TaskEntry>,
}

pub(crate) struct TaskArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    len: usize,
}

impl TaskArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        TaskArena {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, entry: TaskEntry) -> TaskId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            TaskId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            TaskId::new(index, 0)
        }
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&TaskEntry> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskEntry> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Releases the slot. The id, and every copy of it, becomes stale.
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<TaskEntry> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index() as u32);
        self.len -= 1;
        Some(entry)
    }

    /// Removes every entry, leaving the arena empty.
    pub(crate) fn drain(&mut self) -> Vec<TaskEntry> {
        let mut out = Vec::with_capacity(self.len);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entry) = slot.entry.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(index as u32);
                out.push(entry);
            }
        }
        self.len = 0;
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::new_task;

    fn entry() -> TaskEntry {
        new_task(async {}, false).0
    }

    #[test]
    fn insert_and_get() {
        let mut arena = TaskArena::with_capacity(4);
        let a = arena.insert(entry());
        let b = arena.insert(entry());
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert!(arena.get(a).is_some());
        assert!(arena.get_mut(b).is_some());
    }

    #[test]
    fn removed_ids_go_stale() {
        let mut arena = TaskArena::with_capacity(4);
        let a = arena.insert(entry());
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());

        // The slot is reused with a new generation.
        let b = arena.insert(entry());
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn drain_empties() {
        let mut arena = TaskArena::with_capacity(4);
        let a = arena.insert(entry());
        arena.insert(entry());
        assert_eq!(arena.drain().len(), 2);
        assert_eq!(arena.len(), 0);
        assert!(arena.get(a).is_none());
    }
}
