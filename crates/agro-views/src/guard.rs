//! 過期回應保護

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 請求序號
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 只接受最新請求的回應
#[derive(Debug, Clone, Default)]
pub struct RequestGuard {
    latest: Arc<AtomicU64>,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 發出新序號，先前的序號全部失效
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// 使所有已發出的序號失效
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_accepted() {
        let guard = RequestGuard::new();
        let first = guard.issue();
        assert!(guard.is_latest(first));

        let second = guard.issue();
        assert!(!guard.is_latest(first));
        assert!(guard.is_latest(second));
        assert!(second > first);

        guard.invalidate();
        assert!(!guard.is_latest(second));
    }

    #[test]
    fn test_clones_share_sequence() {
        let guard = RequestGuard::new();
        let clone = guard.clone();
        let ticket = guard.issue();
        clone.issue();
        assert!(!guard.is_latest(ticket));
    }
}
