//! Contact callbacks.

use nova_contact::ContactEvent;
use nova_types::BodyId;

/// Bodies a listener asked to remove, applied at the end of the step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalQueue {
    bodies: Vec<BodyId>,
}

impl RemovalQueue {
    /// Queue a body for removal. Duplicates are ignored.
    pub fn push(&mut self, body: BodyId) {
        if !self.bodies.contains(&body) {
            self.bodies.push(body);
        }
    }

    /// Number of queued bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Queued bodies in request order.
    #[must_use]
    pub fn bodies(&self) -> &[BodyId] {
        &self.bodies
    }

    pub(crate) fn take(&mut self) -> Vec<BodyId> {
        std::mem::take(&mut self.bodies)
    }

    pub(crate) fn clear(&mut self) {
        self.bodies.clear();
    }
}

/// Receives contact events from a [`Space`](crate::Space).
///
/// Callbacks run after the narrow phase of every substep, before the solver.
/// The listener value itself carries any user context. Bodies cannot be
/// removed from inside a callback; push them onto `removals` instead.
pub trait ContactListener: Send {
    /// A contact point appeared.
    fn on_contact_added(&mut self, _event: &ContactEvent, _removals: &mut RemovalQueue) {}

    /// A contact point survived from the previous frame.
    fn on_contact_persisted(&mut self, _event: &ContactEvent, _removals: &mut RemovalQueue) {}

    /// A contact point went away.
    fn on_contact_removed(&mut self, _event: &ContactEvent, _removals: &mut RemovalQueue) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_queue_dedups() {
        let mut queue = RemovalQueue::default();
        queue.push(BodyId(3));
        queue.push(BodyId(1));
        queue.push(BodyId(3));
        assert_eq!(queue.bodies(), &[BodyId(3), BodyId(1)]);
        assert_eq!(queue.take(), vec![BodyId(3), BodyId(1)]);
        assert!(queue.is_empty());
    }
}
