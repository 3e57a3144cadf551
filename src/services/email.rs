//! Outbound email - provider trait plus a bounded background worker pool.
//!
//! Delivery is best effort: submission never blocks a login or token
//! path, and a full queue drops the message with a warning rather than
//! stalling the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// A message queued for delivery.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport supplied by the host (SMTP, an API client, a test double).
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error>;
}

/// Provider that only logs. Default for embedded and test setups.
#[derive(Debug, Default, Clone)]
pub struct TracingEmailProvider;

#[async_trait]
impl EmailProvider for TracingEmailProvider {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
        info!(to = %message.to, subject = %message.subject, "email (log-only transport)");
        Ok(())
    }
}

/// Fixed-size pool of delivery tasks fed by a bounded queue.
#[derive(Clone)]
pub struct EmailWorker {
    tx: mpsc::Sender<EmailMessage>,
}

impl EmailWorker {
    /// Spawn `workers` delivery tasks sharing a queue of `queue_size`
    /// messages. Workers exit when every handle to the queue is dropped.
    pub fn start(
        provider: Arc<dyn EmailProvider>,
        workers: usize,
        queue_size: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<EmailMessage>(queue_size.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let provider = Arc::clone(&provider);
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let message = { rx.lock().await.recv().await };
                    let Some(message) = message else { break };
                    if let Err(err) = provider.send(&message).await {
                        warn!(worker_id, to = %message.to, error = %err, "email delivery failed");
                    }
                }
            });
        }

        Self { tx }
    }

    /// Queue a message without waiting. Drops it when the queue is full.
    pub fn submit(&self, message: EmailMessage) {
        if let Err(err) = self.tx.try_send(message) {
            warn!(error = %err, "email queue rejected message");
        }
    }
}
