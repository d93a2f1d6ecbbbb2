use std::future::Future;
use std::time::Duration;

/// Fixed-interval polling with a capped attempt count.
///
/// Server-side migration completes asynchronously from the client's point of
/// view, so consumers wait on a readiness flag rather than assuming the
/// operation finished within one round trip. Returns `true` as soon as the
/// probe does, `false` once `max_attempts` probes have all come back `false`.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        // Observed client pattern: 30 x 1s.
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

pub async fn await_ready<F, Fut>(config: PollConfig, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 0..config.max_attempts {
        if probe().await {
            return true;
        }
        if attempt + 1 < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_ready_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let config = PollConfig {
            max_attempts: 10,
            interval: Duration::from_millis(1),
        };

        let ready = await_ready(config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { n >= 2 }
        })
        .await;

        assert!(ready);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_returns_false() {
        let config = PollConfig {
            max_attempts: 3,
            interval: Duration::from_millis(1),
        };

        let ready = await_ready(config, || async { false }).await;
        assert!(!ready);
    }
}
