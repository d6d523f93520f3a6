//! Pending queue holding envelopes that are waiting for a free slot.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::QueuePolicy;
use crate::core::envelope::Dispatch;
use crate::util::serde::Priority;

/// Pending envelopes, one FIFO lane per priority.
///
/// Under [`QueuePolicy::Fifo`] every envelope goes into a single lane, so
/// dispatch order is submission order. Under [`QueuePolicy::Priority`] the
/// highest non-empty lane is served first and each lane stays FIFO.
///
/// Cancelled entries stay in place until popped or purged. `withdrawn` counts
/// them so the live length is available without walking the lanes.
pub(crate) struct PendingQueue {
    policy: QueuePolicy,
    lanes: BTreeMap<Priority, VecDeque<Box<dyn Dispatch>>>,
    len: usize,
    withdrawn: Arc<AtomicUsize>,
}

impl PendingQueue {
    pub(crate) fn new(policy: QueuePolicy) -> Self {
        Self {
            policy,
            lanes: BTreeMap::new(),
            len: 0,
            withdrawn: Arc::new(AtomicUsize::new(0)),
        }
    }

    const fn lane_for(&self, priority: Priority) -> Priority {
        match self.policy {
            QueuePolicy::Fifo => Priority::Normal,
            QueuePolicy::Priority => priority,
        }
    }

    pub(crate) fn push(&mut self, job: Box<dyn Dispatch>) {
        let lane = self.lane_for(job.priority());
        job.track_withdrawal(Arc::clone(&self.withdrawn));
        self.lanes.entry(lane).or_default().push_back(job);
        self.len += 1;
    }

    /// Remove the next envelope in dispatch order.
    pub(crate) fn pop(&mut self) -> Option<Box<dyn Dispatch>> {
        let job = self
            .lanes
            .values_mut()
            .rev()
            .find_map(|lane| lane.pop_front())?;
        self.len -= 1;
        Some(job)
    }

    /// Entries held, including withdrawn ones not yet purged.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries still waiting to run.
    pub(crate) fn live_len(&self) -> usize {
        self.len.saturating_sub(self.withdrawn.load(Ordering::Relaxed))
    }

    /// Account for a popped entry that turned out to be cancelled.
    pub(crate) fn forget_withdrawn(&self) {
        self.withdrawn.fetch_sub(1, Ordering::Relaxed);
    }

    /// Drop entries that were settled while queued. Returns how many.
    pub(crate) fn purge_settled(&mut self) -> usize {
        let before = self.len;
        for lane in self.lanes.values_mut() {
            lane.retain(|job| !job.is_settled());
        }
        self.len = self.lanes.values().map(VecDeque::len).sum();
        let purged = before - self.len;
        self.withdrawn.fetch_sub(purged, Ordering::Relaxed);
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::envelope::{Envelope, TaskHandle};

    fn job(id: u64, priority: Priority) -> (Box<dyn Dispatch>, TaskHandle<u64, String>) {
        let (envelope, handle) = Envelope::wrap(id, priority, async move { Ok(id) });
        (Box::new(envelope), handle)
    }

    #[test]
    fn test_fifo_ignores_priority() {
        let mut q = PendingQueue::new(QueuePolicy::Fifo);
        let mut handles = Vec::new();
        for (id, priority) in [
            (1, Priority::Low),
            (2, Priority::Critical),
            (3, Priority::Normal),
        ] {
            let (j, h) = job(id, priority);
            q.push(j);
            handles.push(h);
        }

        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|j| j.id()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_priority_ordering() {
        let mut q = PendingQueue::new(QueuePolicy::Priority);
        let mut handles = Vec::new();
        for (id, priority) in [
            (1, Priority::Low),
            (2, Priority::Critical),
            (3, Priority::Normal),
            (4, Priority::High),
            (5, Priority::Critical),
        ] {
            let (j, h) = job(id, priority);
            q.push(j);
            handles.push(h);
        }

        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|j| j.id()).collect();
        assert_eq!(order, vec![2, 5, 4, 3, 1]);
    }

    #[test]
    fn test_purge_settled() {
        let mut q = PendingQueue::new(QueuePolicy::Fifo);
        let (a, ha) = job(1, Priority::Normal);
        let (b, hb) = job(2, Priority::Normal);
        let (c, hc) = job(3, Priority::Normal);
        q.push(a);
        q.push(b);
        q.push(c);

        assert!(hb.cancel());
        assert_eq!(q.len(), 3);
        assert_eq!(q.live_len(), 2);

        assert_eq!(q.purge_settled(), 1);
        assert_eq!(q.len(), 2);
        assert_eq!(q.live_len(), 2);
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).map(|j| j.id()).collect();
        assert_eq!(order, vec![1, 3]);
        drop((ha, hc));
    }

    #[test]
    fn test_popped_cancelled_entry_is_forgotten() {
        let mut q = PendingQueue::new(QueuePolicy::Fifo);
        let (a, ha) = job(1, Priority::Normal);
        let (b, hb) = job(2, Priority::Normal);
        q.push(a);
        q.push(b);
        assert!(ha.cancel());
        assert_eq!(q.live_len(), 1);

        let popped = q.pop().unwrap();
        assert!(!popped.begin());
        q.forget_withdrawn();
        assert_eq!(q.len(), 1);
        assert_eq!(q.live_len(), 1);

        let next = q.pop().unwrap();
        assert!(next.begin());
        assert_eq!(q.live_len(), 0);
        drop(hb);
    }

    #[test]
    fn test_empty_queue() {
        let mut q = PendingQueue::new(QueuePolicy::Priority);
        assert!(q.pop().is_none());
        assert_eq!(q.len(), 0);
        assert_eq!(q.live_len(), 0);
    }
}
