use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::database::{NotificationStore, PaymentRequestStore, StoreRef};
use crate::errors::Result;
use crate::models::notification::Notification;
use crate::models::payment_request::PaymentRequest;

/// Delivers the admin notification for each submitted payment request.
///
/// The request row is its own outbox entry: `admin_notified_at` stays empty
/// until delivery succeeds. Notifications carry a per-request id, so a
/// redelivery after a partial failure never produces a second one.
#[derive(Clone)]
pub struct NotificationOutbox {
    store: StoreRef,
}

impl NotificationOutbox {
    pub fn new(store: StoreRef) -> Self {
        Self { store }
    }

    /// Returns `true` if a new notification was written.
    pub async fn deliver(&self, request: &PaymentRequest) -> Result<bool> {
        let notification = Notification::for_payment_request(request, Utc::now());
        let inserted = self.store.insert_notification_once(&notification).await?;
        self.store
            .mark_admin_notified(&request.id, Utc::now())
            .await?;
        Ok(inserted)
    }

    /// Delivers up to `batch_size` pending entries and returns how many went out.
    pub async fn flush(&self, batch_size: i64) -> Result<usize> {
        let pending = self
            .store
            .undelivered_admin_notifications(batch_size)
            .await?;

        let mut delivered = 0;
        for request in pending {
            match self.deliver(&request).await {
                Ok(_) => delivered += 1,
                Err(e) => tracing::warn!(
                    "⚠️ Admin notification for payment request {} still pending: {}",
                    request.id,
                    e
                ),
            }
        }

        Ok(delivered)
    }

    /// Runs `flush` on a fixed interval until the task is aborted.
    pub fn spawn(self, interval: Duration, batch_size: i64) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.flush(batch_size).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("📬 Delivered {} pending admin notifications", n),
                    Err(e) => tracing::error!("❌ Notification outbox sweep failed: {}", e),
                }
            }
        })
    }
}
