// ABOUTME: Fixed arena of correlation slots keyed by message reference or transaction identifier
// ABOUTME: Claims are test-and-set under one lock and each claimed slot owns a bounded mailbox

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Events a transaction can have queued before further deliveries are refused
const MAILBOX_DEPTH: usize = 4;

enum Slot<E, K> {
    Idle,
    Claimed { tx: mpsc::Sender<E>, key: K },
}

struct State<E, K> {
    slots: Vec<Slot<E, K>>,
    cursor: usize,
}

/// Why an event did not reach a slot owner
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Undelivered<E> {
    /// The slot is idle or its mailbox is full
    NoOwner(E),
    /// The owner's key refused the event
    Refused(E),
}

/// Correlation table shared between the caller-facing side of a state machine
/// and the receive path that routes responses to it
///
/// Each claim carries a key `K` that deliveries can be checked against.
pub(crate) struct Slots<E, K = ()> {
    state: Arc<Mutex<State<E, K>>>,
}

/// Ownership of one slot, released when dropped or finished
pub(crate) struct Claim<E, K = ()> {
    index: usize,
    state: Arc<Mutex<State<E, K>>>,
    rx: mpsc::Receiver<E>,
    released: bool,
}

// Slot mutations never leave the table inconsistent, so a poisoned lock is still usable
fn lock<E, K>(state: &Mutex<State<E, K>>) -> MutexGuard<'_, State<E, K>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E, K> Slots<E, K> {
    /// `capacity` slots, with the allocation cursor starting at `cursor`
    pub(crate) fn new(capacity: usize, cursor: usize) -> Self {
        let slots = (0..capacity).map(|_| Slot::Idle).collect();
        Self {
            state: Arc::new(Mutex::new(State {
                slots,
                cursor: cursor % capacity.max(1),
            })),
        }
    }

    fn occupy(&self, state: &mut State<E, K>, index: usize, key: K) -> Claim<E, K> {
        let (tx, rx) = mpsc::channel(MAILBOX_DEPTH);
        state.slots[index] = Slot::Claimed { tx, key };
        Claim {
            index,
            state: Arc::clone(&self.state),
            rx,
            released: false,
        }
    }

    /// Claim the first idle slot at or after the cursor, wrapping around
    pub(crate) fn claim_keyed(&self, key: K) -> Option<Claim<E, K>> {
        let mut state = lock(&self.state);
        let capacity = state.slots.len();
        let index = (0..capacity)
            .map(|offset| (state.cursor + offset) % capacity)
            .find(|&index| matches!(state.slots[index], Slot::Idle))?;
        state.cursor = (index + 1) % capacity;
        Some(self.occupy(&mut state, index, key))
    }

    pub(crate) fn is_claimed(&self, index: usize) -> bool {
        matches!(
            lock(&self.state).slots.get(index),
            Some(Slot::Claimed { .. })
        )
    }

    /// Queue an event for the owner of a slot if `accept` approves of the
    /// owner's key
    pub(crate) fn deliver_if(
        &self,
        index: usize,
        event: E,
        accept: impl FnOnce(&K, &E) -> bool,
    ) -> Result<(), Undelivered<E>> {
        let state = lock(&self.state);
        let Some(Slot::Claimed { tx, key }) = state.slots.get(index) else {
            return Err(Undelivered::NoOwner(event));
        };
        if !accept(key, &event) {
            return Err(Undelivered::Refused(event));
        }
        tx.try_send(event)
            .map_err(|err| Undelivered::NoOwner(err.into_inner()))
    }

    /// Queue an event for the owner of a slot; the event comes back if the
    /// slot is idle or its mailbox is full
    pub(crate) fn deliver(&self, index: usize, event: E) -> Result<(), E> {
        self.deliver_if(index, event, |_, _| true)
            .map_err(|undelivered| match undelivered {
                Undelivered::NoOwner(event) | Undelivered::Refused(event) => event,
            })
    }

    /// Number of idle slots
    pub(crate) fn available(&self) -> usize {
        lock(&self.state)
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Idle))
            .count()
    }
}

impl<E> Slots<E> {
    pub(crate) fn claim(&self) -> Option<Claim<E>> {
        self.claim_keyed(())
    }

    /// Claim a specific slot if it is idle
    pub(crate) fn claim_at(&self, index: usize) -> Option<Claim<E>> {
        let mut state = lock(&self.state);
        if !matches!(state.slots.get(index), Some(Slot::Idle)) {
            return None;
        }
        Some(self.occupy(&mut state, index, ()))
    }
}

impl<E, K> Claim<E, K> {
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Wait up to `wait` for the next event
    pub(crate) async fn recv_timeout(&mut self, wait: Duration) -> Option<E> {
        tokio::time::timeout(wait, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Release the slot after a timer expired.
    ///
    /// An event delivered before the release wins over the expiry and is
    /// returned; afterwards no delivery can reach this transaction.
    pub(crate) fn finish(&mut self) -> Option<E> {
        let mut state = lock(&self.state);
        let late = self.rx.try_recv().ok();
        if !self.released {
            state.slots[self.index] = Slot::Idle;
            self.released = true;
        }
        late
    }
}

impl<E, K> Drop for Claim<E, K> {
    fn drop(&mut self) {
        if !self.released {
            lock(&self.state).slots[self.index] = Slot::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_cycle_from_cursor() {
        let slots: Slots<u8> = Slots::new(4, 2);
        let a = slots.claim().unwrap();
        let b = slots.claim().unwrap();
        let c = slots.claim().unwrap();
        assert_eq!((a.index(), b.index(), c.index()), (2, 3, 0));
        drop(b);
        let d = slots.claim().unwrap();
        assert_eq!(d.index(), 1);
        let e = slots.claim().unwrap();
        assert_eq!(e.index(), 3);
        assert!(slots.claim().is_none());
        assert_eq!(slots.available(), 0);
    }

    #[test]
    fn claim_at_is_test_and_set() {
        let slots: Slots<u8> = Slots::new(8, 0);
        let claim = slots.claim_at(5).unwrap();
        assert!(slots.claim_at(5).is_none());
        assert!(slots.is_claimed(5));
        drop(claim);
        assert!(!slots.is_claimed(5));
        assert!(slots.claim_at(8).is_none());
    }

    #[tokio::test]
    async fn deliver_reaches_owner_only_while_claimed() {
        let slots: Slots<u8> = Slots::new(2, 0);
        assert_eq!(slots.deliver(0, 1), Err(1));

        let mut claim = slots.claim().unwrap();
        slots.deliver(0, 7).unwrap();
        assert_eq!(claim.recv_timeout(Duration::from_secs(1)).await, Some(7));
        drop(claim);
        assert_eq!(slots.deliver(0, 9), Err(9));
        assert_eq!(slots.available(), 2);
    }

    #[test]
    fn full_mailbox_refuses() {
        let slots: Slots<usize> = Slots::new(1, 0);
        let _claim = slots.claim().unwrap();
        for event in 0..MAILBOX_DEPTH {
            slots.deliver(0, event).unwrap();
        }
        assert_eq!(slots.deliver(0, 99), Err(99));
    }

    #[tokio::test(start_paused = true)]
    async fn finish_prefers_late_event_and_releases_once() {
        let slots: Slots<u8> = Slots::new(1, 0);
        let mut claim = slots.claim().unwrap();
        assert_eq!(claim.recv_timeout(Duration::from_secs(35)).await, None);

        slots.deliver(0, 3).unwrap();
        assert_eq!(claim.finish(), Some(3));
        assert_eq!(slots.deliver(0, 4), Err(4));

        // A new owner is not disturbed when the finished claim is dropped
        let other = slots.claim().unwrap();
        drop(claim);
        assert!(slots.is_claimed(other.index()));
    }

    #[test]
    fn keyed_delivery_checks_the_owner() {
        let slots: Slots<u8, bool> = Slots::new(2, 0);
        let _even = slots.claim_keyed(true).unwrap();
        let accept = |wants_even: &bool, event: &u8| *wants_even == (event % 2 == 0);

        assert_eq!(slots.deliver_if(0, 3, accept), Err(Undelivered::Refused(3)));
        assert_eq!(slots.deliver_if(0, 4, accept), Ok(()));
        assert_eq!(slots.deliver_if(1, 4, accept), Err(Undelivered::NoOwner(4)));
    }
}
