//! ReconciliationWorker processor.
//!
//! Debits that the engine could not credit back inline end up here. The
//! worker retries each one with the configured backoff; credits that still
//! fail stay pending and are retried on every tick until they succeed or
//! the worker shuts down. Anything left at shutdown is logged as an error
//! so an operator can settle it by hand.

use crate::config::{ConfigStore, OrderSettings};
use crate::engine::compensation::{is_retryable, retry_credit};
use crate::events::{CompensationReceiver, CompensationRequired};
use crate::ledger::{AccountLedger, LedgerError};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

pub struct ReconciliationWorker {
    ledger: Arc<dyn AccountLedger>,
    settings: ConfigStore<OrderSettings>,
    compensation_rx: CompensationReceiver,
    shutdown_rx: watch::Receiver<bool>,
    retry_interval: Duration,
    pending: Vec<CompensationRequired>,
}

impl ReconciliationWorker {
    pub fn new(
        ledger: Arc<dyn AccountLedger>,
        settings: ConfigStore<OrderSettings>,
        compensation_rx: CompensationReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ledger,
            settings,
            compensation_rx,
            shutdown_rx,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            pending: Vec::new(),
        }
    }

    /// How often pending credits are retried.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Run the worker until shutdown is signalled.
    pub async fn run(mut self) {
        info!("ReconciliationWorker started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("ReconciliationWorker received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.compensation_rx.recv() => {
                    self.handle(event).await;
                }

                _ = tokio::time::sleep(self.retry_interval), if !self.pending.is_empty() => {
                    for event in std::mem::take(&mut self.pending) {
                        self.handle(event).await;
                    }
                }
            }
        }

        for event in &self.pending {
            error!(
                order_id = %event.order_id,
                buyer_id = %event.buyer_id,
                amount = %event.amount,
                cause = %event.cause,
                reconcile = true,
                "Compensation still unresolved at shutdown"
            );
        }
        info!("ReconciliationWorker shutdown complete");
    }

    async fn handle(&mut self, event: CompensationRequired) {
        match self.process(event.clone()).await {
            Ok(balance) => info!(
                order_id = %event.order_id,
                buyer_id = %event.buyer_id,
                amount = %event.amount,
                %balance,
                "Compensation reconciled"
            ),
            Err(e) if is_retryable(&e) => {
                warn!(
                    order_id = %event.order_id,
                    buyer_id = %event.buyer_id,
                    error = %e,
                    "Compensation still failing, will retry"
                );
                self.pending.push(event);
            }
            Err(e) => error!(
                order_id = %event.order_id,
                buyer_id = %event.buyer_id,
                amount = %event.amount,
                error = %e,
                reconcile = true,
                "Compensation cannot be applied, manual action required"
            ),
        }
    }
}

impl Processor<CompensationRequired> for ReconciliationWorker {
    type Output = Decimal;
    type Error = LedgerError;

    async fn process(&self, event: CompensationRequired) -> Result<Decimal, LedgerError> {
        let policy = self.settings.read().await.compensation.clone();
        retry_credit(self.ledger.as_ref(), event.buyer_id, event.amount, &policy).await
    }
}
