//! Time-ordered views over the event arena

use chronofeat_core::Event;
use std::iter::FusedIterator;

/// Slot of an event in the index arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventRef(pub(crate) usize);

impl EventRef {
    pub fn slot(&self) -> usize {
        self.0
    }
}

/// Lazy, time-ordered sequence of events.
///
/// Cloning yields an independent cursor, so a range can be walked any
/// number of times without querying the index again.
#[derive(Debug, Clone)]
pub struct EventRange<'a> {
    arena: &'a [Event],
    refs: &'a [EventRef],
}

impl<'a> EventRange<'a> {
    pub(crate) fn new(arena: &'a [Event], refs: &'a [EventRef]) -> Self {
        Self { arena, refs }
    }

    pub(crate) fn empty(arena: &'a [Event]) -> Self {
        Self { arena, refs: &[] }
    }

    /// Slots of the remaining events, in order
    pub fn refs(&self) -> &'a [EventRef] {
        self.refs
    }

    pub fn first(&self) -> Option<&'a Event> {
        self.refs.first().map(|r| &self.arena[r.0])
    }

    pub fn last(&self) -> Option<&'a Event> {
        self.refs.last().map(|r| &self.arena[r.0])
    }
}

impl<'a> Iterator for EventRange<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        let (head, rest) = self.refs.split_first()?;
        self.refs = rest;
        Some(&self.arena[head.0])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.refs.len(), Some(self.refs.len()))
    }
}

impl DoubleEndedIterator for EventRange<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (tail, rest) = self.refs.split_last()?;
        self.refs = rest;
        Some(&self.arena[tail.0])
    }
}

impl ExactSizeIterator for EventRange<'_> {}

impl FusedIterator for EventRange<'_> {}
