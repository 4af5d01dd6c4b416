use crate::config::NavigationConfig;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep, timeout};

/// Waits for the network to settle between navigation steps.
///
/// A wait always lasts its minimum. After that it continues for as long as new
/// captures keep arriving, ending once no capture was seen for the quiet window or
/// the extension budget is spent.
#[derive(Debug)]
pub struct Settle {
    progress: watch::Receiver<usize>,
    quiet: Duration,
    max_extension: Duration,
}

impl Settle {
    pub fn new(progress: watch::Receiver<usize>, config: &NavigationConfig) -> Self {
        Self {
            progress,
            quiet: config.quiet(),
            max_extension: config.max_extension(),
        }
    }

    /// Pages captured so far
    pub fn captured(&self) -> usize {
        *self.progress.borrow()
    }

    /// Wait at least `min`, then until captures go quiet
    pub async fn wait(&mut self, min: Duration) {
        let deadline = Instant::now() + min + self.max_extension;
        sleep(min).await;

        if self.quiet.is_zero() {
            return;
        }

        self.progress.borrow_and_update();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                ::log::debug!("Settle wait hit its extension limit");
                break;
            }

            match timeout(self.quiet.min(remaining), self.progress.changed()).await {
                Ok(Ok(())) => {
                    let captured = *self.progress.borrow_and_update();
                    ::log::debug!("Capture arrived while settling ({} so far)", captured);
                }
                // Listener gone, nothing more will arrive
                Ok(Err(_)) => break,
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(quiet_ms: u64, max_extension_ms: u64) -> NavigationConfig {
        NavigationConfig {
            quiet_ms,
            max_extension_ms,
            ..NavigationConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_wait_when_quiet_is_zero() {
        let (_tx, rx) = watch::channel(0usize);
        let mut settle = Settle::new(rx, &config(0, 5000));

        let start = Instant::now();
        settle.wait(Duration::from_millis(500)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(520), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_extends_while_captures_arrive() {
        let (tx, rx) = watch::channel(0usize);
        let mut settle = Settle::new(rx, &config(150, 10_000));

        tokio::spawn(async move {
            for captured in 1..=4 {
                sleep(Duration::from_millis(100)).await;
                let _ = tx.send(captured);
            }
            // Keep the sender alive so the quiet window has to elapse
            sleep(Duration::from_secs(60)).await;
        });

        let start = Instant::now();
        settle.wait(Duration::from_millis(50)).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(400 + 150), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
        assert_eq!(settle.captured(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_capped_by_extension_limit() {
        let (tx, rx) = watch::channel(0usize);
        let mut settle = Settle::new(rx, &config(150, 300));

        tokio::spawn(async move {
            let mut captured = 0;
            loop {
                sleep(Duration::from_millis(50)).await;
                captured += 1;
                if tx.send(captured).is_err() {
                    break;
                }
            }
        });

        let start = Instant::now();
        settle.wait(Duration::from_millis(100)).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(400), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ends_when_listener_is_gone() {
        let (tx, rx) = watch::channel(0usize);
        drop(tx);
        let mut settle = Settle::new(rx, &config(1000, 10_000));

        let start = Instant::now();
        settle.wait(Duration::from_millis(20)).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
