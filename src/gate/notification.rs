//! Self-dismissing cost notification.

use std::time::Duration;

use tokio::time::Instant;

use super::CostReceipt;

/// Default time a notification stays visible.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// A receipt posted after reconciliation, visible for a fixed time.
#[derive(Debug, Clone)]
pub struct CostNotification {
    receipt: CostReceipt,
    posted_at: Instant,
    dismiss_after: Duration,
}

impl CostNotification {
    pub fn new(receipt: CostReceipt, dismiss_after: Duration) -> Self {
        Self::posted_at(receipt, dismiss_after, Instant::now())
    }

    pub fn posted_at(receipt: CostReceipt, dismiss_after: Duration, posted_at: Instant) -> Self {
        Self {
            receipt,
            posted_at,
            dismiss_after,
        }
    }

    pub fn receipt(&self) -> &CostReceipt {
        &self.receipt
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.posted_at) < self.dismiss_after
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ActionKind, ActualUsage};

    fn receipt() -> CostReceipt {
        CostReceipt {
            action: ActionKind::Speech,
            actual: ActualUsage {
                input_tokens: 1,
                output_tokens: 1,
                total_cost: 0.0,
            },
            estimated_cost: 0.0,
        }
    }

    #[test]
    fn test_dismissed_after_delay() {
        let start = Instant::now();
        let note = CostNotification::posted_at(receipt(), DEFAULT_DISMISS_AFTER, start);

        assert!(note.is_visible_at(start));
        assert!(note.is_visible_at(start + Duration::from_millis(4_999)));
        assert!(!note.is_visible_at(start + Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissal_follows_tokio_clock() {
        let note = CostNotification::new(receipt(), DEFAULT_DISMISS_AFTER);
        assert!(note.is_visible());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!note.is_visible());
    }
}
