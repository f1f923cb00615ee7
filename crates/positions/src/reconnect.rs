use std::time::Duration;

/// Delay applied between reconnection attempts when neither the policy nor
/// the server specifies one.
pub const DEFAULT_RETRY: Duration = Duration::from_secs(3);

/// Policy deciding whether, and after how long, a dropped position stream is
/// reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnect {
    /// Retry indefinitely after a fixed delay. A server `retry:` hint takes
    /// precedence over the configured delay.
    Fixed(Duration),

    /// Double the delay on each consecutive failure, capped at `max`. Gives up
    /// after `max_attempts` consecutive failures when set.
    Exponential { initial: Duration, max: Duration, max_attempts: Option<u32> },

    /// Never reconnect.
    Never,
}

impl Default for Reconnect {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RETRY)
    }
}

impl Reconnect {
    /// Delay before reconnect attempt number `attempt` (zero based, counting
    /// consecutive failures), or `None` when the policy is exhausted.
    #[must_use]
    pub fn next_delay(&self, attempt: u32, hint: Option<Duration>) -> Option<Duration> {
        match *self {
            Self::Fixed(delay) => Some(hint.unwrap_or(delay)),
            Self::Exponential { initial, max, max_attempts } => {
                if max_attempts.is_some_and(|limit| attempt >= limit) {
                    return None;
                }
                let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
                Some(initial.saturating_mul(factor).min(max))
            }
            Self::Never => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_is_unbounded() {
        let policy = Reconnect::default();
        assert_eq!(policy.next_delay(0, None), Some(DEFAULT_RETRY));
        assert_eq!(policy.next_delay(10_000, None), Some(DEFAULT_RETRY));
        assert_eq!(policy.next_delay(1, Some(Duration::from_secs(9))), Some(Duration::from_secs(9)));
    }

    #[test]
    fn exponential_backoff() {
        let policy = Reconnect::Exponential {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(5),
            max_attempts: Some(6),
        };

        let delays = (0..7).map(|n| policy.next_delay(n, None)).collect::<Vec<_>>();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_millis(500)),
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(5)),
                None,
            ]
        );
    }

    #[test]
    fn exponential_without_limit_saturates() {
        let policy = Reconnect::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            max_attempts: None,
        };
        assert_eq!(policy.next_delay(64, None), Some(Duration::from_secs(30)));
    }

    #[test]
    fn never() {
        assert_eq!(Reconnect::Never.next_delay(0, Some(Duration::from_secs(1))), None);
    }
}
