use std::{collections::HashMap, fmt};

use super::ReplyHandler;

/// Request ids and the handlers waiting on them.
///
/// Ids come from a wrapping 32-bit counter. Zero marks a message that expects no reply,
/// so it is never handed out, and neither is an id that is still in flight.
#[derive(Default)]
pub(crate) struct Correlator {
    last_id: u32,
    pending: HashMap<u32, Box<dyn ReplyHandler>>,
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("last_id", &self.last_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Correlator {
    /// Allocates an id and parks `handler` under it.
    pub fn register(&mut self, handler: Box<dyn ReplyHandler>) -> u32 {
        let id = self.next_id();
        self.pending.insert(id, handler);
        id
    }

    /// Removes the handler for `id`. A second call for the same id finds nothing.
    pub fn take(&mut self, id: u32) -> Option<Box<dyn ReplyHandler>> {
        self.pending.remove(&id)
    }

    /// Removes every outstanding handler.
    pub fn drain(&mut self) -> Vec<(u32, Box<dyn ReplyHandler>)> {
        self.pending.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    fn next_id(&mut self) -> u32 {
        loop {
            self.last_id = self.last_id.wrapping_add(1);
            if self.last_id != 0 && !self.pending.contains_key(&self.last_id) {
                return self.last_id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::ReplyHeader;

    use super::*;

    fn handler() -> Box<dyn ReplyHandler> {
        Box::new(|_: &ReplyHeader, _: usize, _: &[u8]| {})
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut correlator = Correlator::default();
        let ids = (0..3)
            .map(|_| correlator.register(handler()))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(correlator.len(), 3);
    }

    #[test]
    fn wraparound_skips_zero() {
        let mut correlator = Correlator {
            last_id: u32::MAX - 1,
            ..Default::default()
        };
        assert_eq!(correlator.register(handler()), u32::MAX);
        assert_eq!(correlator.register(handler()), 1);
    }

    #[test]
    fn in_flight_ids_are_not_reused() {
        let mut correlator = Correlator::default();
        assert_eq!(correlator.register(handler()), 1);
        assert_eq!(correlator.register(handler()), 2);
        correlator.take(1);

        correlator.last_id = u32::MAX;
        // 1 is free again, 2 is still waiting
        assert_eq!(correlator.register(handler()), 1);
        assert_eq!(correlator.register(handler()), 3);
    }

    #[test]
    fn take_removes_once() {
        let mut correlator = Correlator::default();
        let id = correlator.register(handler());

        assert!(correlator.take(id).is_some());
        assert!(correlator.take(id).is_none());
        assert!(correlator.take(0).is_none());
        assert_eq!(correlator.len(), 0);
    }

    #[test]
    fn drain_empties_map() {
        let mut correlator = Correlator::default();
        correlator.register(handler());
        correlator.register(handler());

        let mut ids = correlator.drain().into_iter().map(|(id, _)| id).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(correlator.len(), 0);
    }
}
