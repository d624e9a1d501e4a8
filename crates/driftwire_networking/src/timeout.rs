//! # Timeout Queue
//!
//! Expires registered items after a fixed duration.
//!
//! Items carry an opaque `u64` of user data (the fragment queue stores the
//! fragment sequence there). Expiry is driven by the owner calling
//! [`TimeoutQueue::update_timeouts`] once per tick; nothing runs in the
//! background.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

/// Handle to a registered timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeoutId(u64);

/// What to do with an item whose timeout fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutResult {
    /// Keep the item and rearm it with its original duration.
    Refresh,
    /// Drop the item.
    Delete,
}

#[derive(Clone, Copy, Debug)]
struct TimeoutItem {
    user_data: u64,
    duration: Duration,
    expires_at: Instant,
}

/// Registered timeouts, ordered by expiry.
#[derive(Debug, Default)]
pub struct TimeoutQueue {
    items: HashMap<TimeoutId, TimeoutItem>,
    /// May hold stale entries for removed or refreshed items; they are
    /// skipped when popped.
    schedule: BinaryHeap<Reverse<(Instant, TimeoutId)>>,
    next_id: u64,
}

impl TimeoutQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `user_data` to expire `duration` from now.
    pub fn register_item(&mut self, user_data: u64, duration: Duration) -> TimeoutId {
        self.register_item_at(user_data, duration, Instant::now())
    }

    /// Registers `user_data` to expire `duration` after `now`.
    pub fn register_item_at(&mut self, user_data: u64, duration: Duration, now: Instant) -> TimeoutId {
        let id = TimeoutId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let expires_at = now + duration;
        self.items.insert(
            id,
            TimeoutItem {
                user_data,
                duration,
                expires_at,
            },
        );
        self.schedule.push(Reverse((expires_at, id)));
        id
    }

    /// Cancels a registration. Returns false if it already fired or was
    /// removed.
    pub fn remove_item(&mut self, id: TimeoutId) -> bool {
        self.items.remove(&id).is_some()
    }

    /// Returns the user data of a live registration.
    #[must_use]
    pub fn retrieve_item(&self, id: TimeoutId) -> Option<u64> {
        self.items.get(&id).map(|item| item.user_data)
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.items.clear();
        self.schedule.clear();
    }

    /// Fires every registration that has expired by now.
    pub fn update_timeouts<F>(&mut self, handler: F)
    where
        F: FnMut(TimeoutId, u64) -> TimeoutResult,
    {
        self.update_timeouts_at(Instant::now(), handler);
    }

    /// Fires every registration that has expired by `now`, in expiry order.
    ///
    /// Items refreshed by the handler are rearmed relative to `now` and do not
    /// fire again during this call.
    pub fn update_timeouts_at<F>(&mut self, now: Instant, mut handler: F)
    where
        F: FnMut(TimeoutId, u64) -> TimeoutResult,
    {
        let mut rearmed = Vec::new();
        while let Some(&Reverse((expires_at, id))) = self.schedule.peek() {
            if expires_at > now {
                break;
            }
            self.schedule.pop();

            let Some(item) = self.items.get_mut(&id) else {
                continue;
            };
            if item.expires_at != expires_at {
                continue;
            }

            match handler(id, item.user_data) {
                TimeoutResult::Refresh => {
                    item.expires_at = now + item.duration;
                    rearmed.push(Reverse((item.expires_at, id)));
                }
                TimeoutResult::Delete => {
                    self.items.remove(&id);
                }
            }
        }
        self.schedule.extend(rearmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn test_fires_only_after_duration() {
        let start = Instant::now();
        let mut queue = TimeoutQueue::new();
        let id = queue.register_item_at(7, TIMEOUT, start);

        let mut fired = Vec::new();
        queue.update_timeouts_at(start + Duration::from_millis(99), |id, data| {
            fired.push((id, data));
            TimeoutResult::Delete
        });
        assert!(fired.is_empty());

        queue.update_timeouts_at(start + TIMEOUT, |id, data| {
            fired.push((id, data));
            TimeoutResult::Delete
        });
        assert_eq!(fired, vec![(id, 7)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fires_in_expiry_order() {
        let start = Instant::now();
        let mut queue = TimeoutQueue::new();
        queue.register_item_at(1, Duration::from_millis(30), start);
        queue.register_item_at(2, Duration::from_millis(10), start);
        queue.register_item_at(3, Duration::from_millis(20), start);

        let mut order = Vec::new();
        queue.update_timeouts_at(start + TIMEOUT, |_, data| {
            order.push(data);
            TimeoutResult::Delete
        });
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_removed_item_never_fires() {
        let start = Instant::now();
        let mut queue = TimeoutQueue::new();
        let id = queue.register_item_at(9, TIMEOUT, start);
        assert_eq!(queue.retrieve_item(id), Some(9));
        assert!(queue.remove_item(id));
        assert!(!queue.remove_item(id));

        queue.update_timeouts_at(start + TIMEOUT * 2, |_, _| {
            panic!("removed item fired");
        });
    }

    #[test]
    fn test_refresh_rearms() {
        let start = Instant::now();
        let mut queue = TimeoutQueue::new();
        let id = queue.register_item_at(5, TIMEOUT, start);

        let mut calls = 0;
        queue.update_timeouts_at(start + TIMEOUT, |_, _| {
            calls += 1;
            TimeoutResult::Refresh
        });
        assert_eq!(calls, 1);
        assert_eq!(queue.retrieve_item(id), Some(5));

        queue.update_timeouts_at(start + TIMEOUT + Duration::from_millis(50), |_, _| {
            calls += 1;
            TimeoutResult::Delete
        });
        assert_eq!(calls, 1);

        queue.update_timeouts_at(start + TIMEOUT * 2, |_, _| {
            calls += 1;
            TimeoutResult::Delete
        });
        assert_eq!(calls, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_duration_refresh_does_not_spin() {
        let start = Instant::now();
        let mut queue = TimeoutQueue::new();
        queue.register_item_at(1, Duration::ZERO, start);

        let mut calls = 0;
        queue.update_timeouts_at(start, |_, _| {
            calls += 1;
            TimeoutResult::Refresh
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_clear() {
        let mut queue = TimeoutQueue::new();
        queue.register_item(1, TIMEOUT);
        queue.register_item(2, TIMEOUT);
        assert_eq!(queue.len(), 2);
        queue.clear();
        assert!(queue.is_empty());
    }
}
