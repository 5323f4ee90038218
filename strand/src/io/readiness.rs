use std::{io, os::unix::io::RawFd, time::Duration};

use fxhash::FxHashMap;
use mio::{unix::SourceFd, Events, Poll, Token};

use super::Interest;
use crate::{awaiter::Continuation, task::TaskId};

/// Handle to a registered readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoKey {
    source: RawFd,
    seq: u64,
}

impl IoKey {
    /// The descriptor being waited on.
    pub fn source(&self) -> RawFd {
        self.source
    }
}

struct IoEntry {
    seq: u64,
    interest: Interest,
    cont: Continuation,
}

/// 就绪表：I/O源到当前等待它的唯一续体的映射。
///
/// Sources are registered with mio only while a continuation waits on them,
/// and deregistered as soon as it is handed back.
pub(crate) struct ReadinessTable {
    poll: Poll,
    events: Events,
    entries: FxHashMap<RawFd, IoEntry>,
    next_seq: u64,
}

impl ReadinessTable {
    pub(crate) fn new(events_capacity: usize) -> io::Result<Self> {
        Ok(ReadinessTable {
            poll: Poll::new()?,
            events: Events::with_capacity(events_capacity),
            entries: FxHashMap::default(),
            next_seq: 0,
        })
    }

    /// Stores `cont` as the waiter of `source`.
    ///
    /// The task already waiting on `source` may register again; its previous
    /// continuation is returned so the caller can drop it outside any borrow.
    pub(crate) fn register(
        &mut self,
        source: RawFd,
        interest: Interest,
        cont: Continuation,
    ) -> Result<(IoKey, Option<Continuation>), (io::Error, Continuation)> {
        let token = Token(source as usize);
        if let Some(entry) = self.entries.get_mut(&source) {
            if entry.cont.task() != cont.task() {
                let error = io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("fd {source} already has a waiting task"),
                );
                return Err((error, cont));
            }
            if entry.interest != interest {
                if let Err(error) =
                    self.poll
                        .registry()
                        .reregister(&mut SourceFd(&source), token, interest.into())
                {
                    return Err((error, cont));
                }
                entry.interest = interest;
            }
            let key = IoKey {
                source,
                seq: entry.seq,
            };
            let previous = std::mem::replace(&mut entry.cont, cont);
            return Ok((key, Some(previous)));
        }

        if let Err(error) = self
            .poll
            .registry()
            .register(&mut SourceFd(&source), token, interest.into())
        {
            return Err((error, cont));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            source,
            IoEntry {
                seq,
                interest,
                cont,
            },
        );
        Ok((IoKey { source, seq }, None))
    }

    /// Blocks for at most `timeout` (forever for `None`) and removes every
    /// entry whose source became ready.
    pub(crate) fn poll(&mut self, timeout: Option<Duration>) -> io::Result<Vec<Continuation>> {
        if let Err(error) = self.poll.poll(&mut self.events, timeout) {
            if error.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(error);
        }
        let mut ready = Vec::new();
        for event in self.events.iter() {
            let source = event.token().0 as RawFd;
            if let Some(entry) = self.entries.remove(&source) {
                let _ = self.poll.registry().deregister(&mut SourceFd(&source));
                ready.push(entry.cont);
            }
        }
        Ok(ready)
    }

    pub(crate) fn remove(&mut self, key: IoKey) -> Option<Continuation> {
        match self.entries.get(&key.source) {
            Some(entry) if entry.seq == key.seq => {}
            _ => return None,
        }
        let entry = self.entries.remove(&key.source)?;
        let _ = self.poll.registry().deregister(&mut SourceFd(&key.source));
        Some(entry.cont)
    }

    pub(crate) fn contains(&self, key: IoKey) -> bool {
        matches!(self.entries.get(&key.source), Some(entry) if entry.seq == key.seq)
    }

    /// Removes every entry whose continuation resumes `task`.
    pub(crate) fn remove_task(&mut self, task: TaskId) -> Vec<Continuation> {
        let sources: Vec<RawFd> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.cont.task() == Some(task))
            .map(|(source, _)| *source)
            .collect();
        sources
            .into_iter()
            .filter_map(|source| {
                let _ = self.poll.registry().deregister(&mut SourceFd(&source));
                self.entries.remove(&source).map(|entry| entry.cont)
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) -> Vec<Continuation> {
        let registry = self.poll.registry();
        self.entries
            .drain()
            .map(|(source, entry)| {
                let _ = registry.deregister(&mut SourceFd(&source));
                entry.cont
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        os::unix::{io::AsRawFd, net::UnixStream},
        task::Context,
    };

    use super::*;

    #[test]
    fn fires_once_ready() {
        let waker = futures::task::noop_waker();
        let cx = Context::from_waker(&waker);
        let (mut a, b) = UnixStream::pair().unwrap();
        let mut table = ReadinessTable::new(16).unwrap();

        let (key, previous) = table
            .register(b.as_raw_fd(), Interest::Readable, Continuation::new(&cx))
            .unwrap();
        assert!(previous.is_none());
        assert!(table.contains(key));
        assert!(table.poll(Some(Duration::ZERO)).unwrap().is_empty());

        a.write_all(b"ping").unwrap();
        let ready = table.poll(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(ready.len(), 1);
        assert!(!table.contains(key));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn same_waiter_replaces() {
        let waker = futures::task::noop_waker();
        let cx = Context::from_waker(&waker);
        let (_a, b) = UnixStream::pair().unwrap();
        let mut table = ReadinessTable::new(16).unwrap();

        let (key, _) = table
            .register(b.as_raw_fd(), Interest::Readable, Continuation::new(&cx))
            .unwrap();
        let (again, previous) = table
            .register(b.as_raw_fd(), Interest::Both, Continuation::new(&cx))
            .unwrap();
        assert_eq!(key, again);
        assert!(previous.is_some());
        assert_eq!(table.len(), 1);

        assert!(table.remove(key).is_some());
        assert!(table.remove(key).is_none());
        assert_eq!(table.clear().len(), 0);
    }
}
