use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::LeadChannel;
use crate::models::quote::Quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling each time.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(2) }
    }
}

/// Sending half of the notification queue.
///
/// A single worker owns the receiving half. Dropping every `Outbox` lets the
/// worker finish the queued quotes and exit.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Quote>,
}

impl Outbox {
    pub fn start(
        capacity: usize,
        channels: Vec<Arc<dyn LeadChannel>>,
        retry: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(rx, channels, retry));
        (Self { tx }, worker)
    }

    /// Queues `quote` for delivery. Never blocks; returns `false` when the
    /// quote could not be queued.
    pub fn enqueue(&self, quote: Quote) -> bool {
        let id = quote.id;
        match self.tx.try_send(quote) {
            Ok(()) => {
                debug!(quote_id = id, "Quote queued for notification");
                true
            }
            Err(TrySendError::Full(_)) => {
                error!(quote_id = id, "Notification queue full; follow up manually");
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!(quote_id = id, "Notification worker stopped; follow up manually");
                false
            }
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<Quote>, channels: Vec<Arc<dyn LeadChannel>>, retry: RetryPolicy) {
    info!(channels = channels.len(), "Notification worker started");
    while let Some(quote) = rx.recv().await {
        let quote = Arc::new(quote);
        let mut deliveries = JoinSet::new();
        for channel in &channels {
            let channel = Arc::clone(channel);
            let quote = Arc::clone(&quote);
            deliveries.spawn(async move { deliver_with_retry(channel.as_ref(), &quote, retry).await });
        }
        while let Some(joined) = deliveries.join_next().await {
            if let Err(e) = joined {
                error!(quote_id = quote.id, error = %e, "Delivery task panicked");
            }
        }
    }
    info!("Notification worker stopped");
}

async fn deliver_with_retry(channel: &dyn LeadChannel, quote: &Quote, retry: RetryPolicy) -> bool {
    let attempts = retry.max_attempts.max(1);
    for attempt in 1..=attempts {
        match channel.deliver(quote).await {
            Ok(()) => {
                info!(quote_id = quote.id, channel = channel.name(), attempt, "Lead delivered");
                return true;
            }
            Err(e) if attempt < attempts => {
                let delay = retry.delay_after(attempt);
                warn!(quote_id = quote.id, channel = channel.name(), attempt, error = %e, ?delay, "Lead delivery failed; retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(quote_id = quote.id, channel = channel.name(), attempts, error = %e, "Lead delivery abandoned; follow up manually");
            }
        }
    }
    false
}
