//! Enrichment notifications
//!
//! After a token record is (re)enriched its address is published so
//! downstream consumers can react without polling the store.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, token_address: &str);
}

/// Logs the address and nothing else
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, token_address: &str) {
        info!(token = token_address, "token record updated");
    }
}

/// Fans the address out over a broadcast channel
pub struct ChannelNotifier {
    sender: broadcast::Sender<String>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn publish(&self, token_address: &str) {
        // Only fails when nobody is subscribed, which is fine
        let _ = self.sender.send(token_address.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let notifier = ChannelNotifier::new(8);
        let mut rx = notifier.subscribe();
        notifier.publish("mint-address").await;
        assert_eq!(rx.recv().await.unwrap(), "mint-address");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let notifier = ChannelNotifier::new(8);
        notifier.publish("mint-address").await;
    }
}
