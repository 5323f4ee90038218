use std::io;

use crate::runtime::EventLoop;

// ===== basic builder structure definition =====

/// Event loop builder
///
/// 事件循环构建器。
#[derive(Debug, Clone)]
pub struct EventLoopBuilder {
    // ready queue and task arena capacity
    entries: Option<u32>,

    // mio events buffer capacity
    events_capacity: usize,

    // readiness table (mio) enabled
    enable_io: bool,
}

const DEFAULT_ENTRIES: u32 = 1024;
const DEFAULT_EVENTS_CAPACITY: usize = 1024;

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopBuilder {
    /// Create a default loop builder.
    ///
    /// I/O readiness is enabled by default on unix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: None,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            enable_io: cfg!(unix),
        }
    }

    /// Set how many tasks the ready queue and task arena preallocate room
    /// for. They grow past it on demand.
    #[must_use]
    pub fn with_entries(mut self, entries: u32) -> Self {
        self.entries = Some(entries);
        self
    }

    /// Set the capacity of the readiness event buffer.
    #[must_use]
    pub fn with_events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = capacity.max(1);
        self
    }

    /// Enable or disable the readiness table.
    ///
    /// A loop without it parks with a plain thread sleep, and `register_io`
    /// fails with `ErrorKind::Unsupported`. Ignored on non-unix targets.
    #[must_use]
    pub fn enable_io(mut self, enable: bool) -> Self {
        self.enable_io = enable && cfg!(unix);
        self
    }

    /// Build the event loop.
    pub fn build(self) -> io::Result<EventLoop> {
        EventLoop::from_builder(&self)
    }

    pub(crate) fn entries(&self) -> usize {
        self.entries.unwrap_or(DEFAULT_ENTRIES) as usize
    }

    #[cfg_attr(not(unix), allow(dead_code))]
    pub(crate) fn events_capacity(&self) -> usize {
        self.events_capacity
    }

    #[cfg_attr(not(unix), allow(dead_code))]
    pub(crate) fn io_enabled(&self) -> bool {
        self.enable_io
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder = EventLoopBuilder::new();
        assert_eq!(builder.entries(), DEFAULT_ENTRIES as usize);
        assert_eq!(builder.io_enabled(), cfg!(unix));
    }

    #[test]
    fn configured() {
        let builder = EventLoopBuilder::new()
            .with_entries(16)
            .with_events_capacity(0)
            .enable_io(false);
        assert_eq!(builder.entries(), 16);
        assert_eq!(builder.events_capacity(), 1);
        assert!(!builder.io_enabled());

        let el = builder.build().unwrap();
        assert!(el.is_drained());
    }
}
