//! Confirmation outbox worker and the HTTP notifier adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info, instrument};

use checkout_types::{ConfirmationJob, Notifier, NotifyError, OrderRepository, PaymentConfirmation};

/// Notifier adapter posting confirmations to the notification service.
pub struct HttpNotifier {
    client: reqwest::Client,
    target_url: String,
}

impl HttpNotifier {
    pub fn new(target_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            target_url,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_payment_confirmation(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.target_url)
            .json(confirmation)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Delivery(format!("HTTP {}", resp.status())))
        }
    }
}

/// Drains the confirmation outbox and hands payloads to the notifier.
///
/// Rows are keyed unique per order at insert time, so the worker can be
/// restarted or run concurrently with webhook handling without producing
/// duplicate client notifications.
pub struct ConfirmationWorker<R: OrderRepository, N: Notifier> {
    repo: Arc<R>,
    notifier: N,
}

impl<R: OrderRepository, N: Notifier> ConfirmationWorker<R, N> {
    pub fn new(repo: Arc<R>, notifier: N) -> Self {
        Self { repo, notifier }
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!("Starting confirmation worker");
        loop {
            match self.repo.pending_confirmations(10).await {
                Ok(jobs) => {
                    if !jobs.is_empty() {
                        info!("Processing {} pending confirmations", jobs.len());
                        for job in jobs {
                            self.process_job(job).await;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to fetch pending confirmations: {}", e);
                }
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, order_id = %job.order_id))]
    async fn process_job(&self, job: ConfirmationJob) {
        let (delivered, last_error) = match self
            .notifier
            .send_payment_confirmation(&job.payload)
            .await
        {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };

        if let Err(e) = self
            .repo
            .mark_confirmation(job.id, delivered, last_error)
            .await
        {
            error!("Failed to update confirmation status: {}", e);
        }
    }
}
