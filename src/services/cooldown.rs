use std::time::Duration;
use tokio::time::Instant;

/// Outcome of asking whether a submission may start now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownCheck {
    Allowed,
    Wait { remaining: Duration },
}

impl CooldownCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownCheck::Allowed)
    }

    /// Whole seconds left, rounded up so "0 seconds" is never shown.
    pub fn remaining_secs(&self) -> u64 {
        match self {
            CooldownCheck::Allowed => 0,
            CooldownCheck::Wait { remaining } => {
                let secs = remaining.as_secs();
                if remaining.subsec_nanos() > 0 {
                    secs + 1
                } else {
                    secs
                }
            }
        }
    }
}

/// Minimum spacing between successful submissions of one session. Checking
/// never moves the clock; only `record_success` does.
#[derive(Debug, Clone)]
pub struct SubmissionCooldown {
    window: Duration,
    last_success: Option<Instant>,
}

impl SubmissionCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_success: None,
        }
    }

    pub fn try_acquire(&self, now: Instant) -> CooldownCheck {
        match self.last_success {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.window {
                    CooldownCheck::Allowed
                } else {
                    CooldownCheck::Wait {
                        remaining: self.window - elapsed,
                    }
                }
            }
            None => CooldownCheck::Allowed,
        }
    }

    pub fn record_success(&mut self, now: Instant) {
        self.last_success = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cooldown_allows() {
        let cooldown = SubmissionCooldown::new(Duration::from_secs(10));
        assert!(cooldown.try_acquire(Instant::now()).is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_after_success() {
        let mut cooldown = SubmissionCooldown::new(Duration::from_secs(10));
        cooldown.record_success(Instant::now());

        tokio::time::advance(Duration::from_millis(3_500)).await;
        let check = cooldown.try_acquire(Instant::now());
        assert_eq!(
            check,
            CooldownCheck::Wait {
                remaining: Duration::from_millis(6_500)
            }
        );
        assert_eq!(check.remaining_secs(), 7);

        tokio::time::advance(Duration::from_millis(6_500)).await;
        assert!(cooldown.try_acquire(Instant::now()).is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_checking_does_not_reset_clock() {
        let mut cooldown = SubmissionCooldown::new(Duration::from_secs(10));
        cooldown.record_success(Instant::now());

        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(2)).await;
            cooldown.try_acquire(Instant::now());
        }
        assert!(cooldown.try_acquire(Instant::now()).is_allowed());
    }

    #[test]
    fn test_remaining_secs_rounding() {
        let exact = CooldownCheck::Wait {
            remaining: Duration::from_secs(4),
        };
        assert_eq!(exact.remaining_secs(), 4);
        assert_eq!(CooldownCheck::Allowed.remaining_secs(), 0);
    }
}
