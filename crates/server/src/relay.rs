//! The Fetch → Detect → Format → Send pipeline shared by the webhook
//! receiver and the polling loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use relay_core::detector::{advance, detect_new};
use relay_core::{ChangeKind, RelayError, SyncState};
use relay_notify::{DispatchResult, Formatter, Notification, Notifier, NotifyError};
use relay_notion::{QueryFilter, SourceClient};

/// Longest wait honoured for a rate-limited send before its single retry.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Summary of one polling cycle.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PollReport {
    pub fetched: usize,
    pub new: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct Relay {
    source: Arc<dyn SourceClient>,
    sink: Arc<dyn Notifier>,
    formatter: Formatter,
    send_delay: Duration,
}

impl Relay {
    pub fn new(
        source: Arc<dyn SourceClient>,
        sink: Arc<dyn Notifier>,
        formatter: Formatter,
        send_delay: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            formatter,
            send_delay,
        }
    }

    pub fn channel_name(&self) -> &str {
        self.sink.channel_name()
    }

    /// Send with one retry when the sink reports a rate limit.
    async fn deliver(&self, notification: &Notification) -> DispatchResult {
        let start = Instant::now();
        let mut result = self.sink.send(notification).await;

        if let Err(NotifyError::RateLimited { retry_after_secs }) = &result {
            let wait = Duration::from_secs(*retry_after_secs).min(MAX_RETRY_WAIT);
            warn!(
                subject = %notification.subject,
                wait_secs = wait.as_secs(),
                "rate limited, retrying once"
            );
            tokio::time::sleep(wait).await;
            result = self.sink.send(notification).await;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let record_id = notification.record_id().unwrap_or("-").to_string();
        match result {
            Ok(()) => {
                info!(
                    channel = self.sink.channel_name(),
                    record_id = %record_id,
                    subject = %notification.subject,
                    duration_ms,
                    "message delivered"
                );
                DispatchResult {
                    channel: self.sink.channel_name().to_string(),
                    record_id,
                    success: true,
                    error: None,
                    duration_ms,
                }
            }
            Err(e) => {
                error!(
                    channel = self.sink.channel_name(),
                    record_id = %record_id,
                    error = %e,
                    "message delivery failed"
                );
                DispatchResult {
                    channel: self.sink.channel_name().to_string(),
                    record_id,
                    success: false,
                    error: Some(e.to_string()),
                    duration_ms,
                }
            }
        }
    }

    /// Fetch one changed page and forward it.
    pub async fn relay_page(
        &self,
        page_id: &str,
        kind: ChangeKind,
    ) -> Result<DispatchResult, RelayError> {
        let record = self.source.fetch_record(page_id).await?;
        debug!(page_id, ?kind, title = %record.title, "fetched changed page");
        let notification = self.formatter.change_notification(&record, kind);
        Ok(self.deliver(&notification).await)
    }

    /// One polling cycle. The watermark advances only after a successful fetch.
    pub async fn poll_once(
        &self,
        state: &mut SyncState,
        new_only: bool,
    ) -> Result<PollReport, RelayError> {
        let filter = match (new_only, state.watermark) {
            (true, Some(mark)) => QueryFilter::CreatedOnOrAfter(mark.date_naive()),
            _ => QueryFilter::All,
        };

        let records = self.source.query(filter).await?;
        let fresh = detect_new(state.watermark, &records);
        let mut report = PollReport {
            fetched: records.len(),
            new: fresh.len(),
            ..PollReport::default()
        };

        for (i, record) in fresh.iter().enumerate() {
            if i > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            let notification = self.formatter.record_notification(record);
            if self.deliver(&notification).await.success {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        advance(state, &records);
        state.mark_polled(Utc::now());
        info!(
            fetched = report.fetched,
            new = report.new,
            sent = report.sent,
            failed = report.failed,
            watermark = ?state.watermark,
            "poll complete"
        );
        Ok(report)
    }

    /// Send an ad hoc message, escaped for the configured markup.
    pub async fn send_text(&self, text: &str) -> Result<DispatchResult, RelayError> {
        if text.trim().is_empty() {
            return Err(RelayError::Delivery("message is empty".to_string()));
        }
        let result = self.deliver(&self.formatter.text_notification(text)).await;
        match &result.error {
            Some(e) => Err(RelayError::Delivery(e.clone())),
            None => Ok(result),
        }
    }

    /// Check both ends. Returns the database title and the bot name.
    pub async fn check(&self) -> (Result<String, RelayError>, Result<String, RelayError>) {
        let source = self.source.ping().await.map_err(RelayError::from);
        let sink = self.sink.test().await.map_err(RelayError::from);
        (source, sink)
    }
}
