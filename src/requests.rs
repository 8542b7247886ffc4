//! Last-request-wins bookkeeping for asynchronous path requests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Monotonic generation counter. A result is applied only while its
/// ticket is still the newest one handed out.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding every earlier one.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.0
    }

    /// Supersede whatever is in flight without starting anything new.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_ticket_wins() {
        let tracker = RequestTracker::new();
        let first = tracker.begin();
        assert!(tracker.is_current(first));
        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        assert!(second.generation() > first.generation());
        tracker.cancel();
        assert!(!tracker.is_current(second));
    }

    #[test]
    fn exactly_one_concurrent_request_is_current() {
        let tracker = RequestTracker::new();
        let tickets: Vec<RequestTicket> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| tracker.begin())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(tickets.iter().filter(|&&t| tracker.is_current(t)).count(), 1);
    }
}
