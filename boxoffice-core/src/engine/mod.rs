//! Order transaction engine.
//!
//! One purchase attempt is a single linear pass:
//! `Started -> EventResolved -> Priced -> FundsReserved -> StockReserved -> Success`.
//! The engine holds no lock across steps. The ledger debit always comes
//! before the stock reservation; if the reservation fails (or the deadline
//! has passed by then) the debit is credited back before the attempt ends.
//! Every attempt, successful or not, is written to the journal exactly once.

pub mod compensation;
pub mod pricing;

use crate::catalog::{EventCatalog, ReserveError};
use crate::config::{ConfigStore, OrderSettings};
use crate::entities::event::EventSnapshot;
use crate::entities::order::{
    NewOrder, Order, OrderLineRequest, OrderPhase, OrderStatus, ResolvedLine,
};
use crate::entities::{EventId, OrderId, TicketClassId, UserId};
use crate::events::{CompensationRequired, CompensationSender};
use crate::framework::StorageError;
use crate::journal::OrderJournal;
use crate::ledger::{AccountLedger, LedgerError};
use compensation::retry_credit;
use kanau::processor::Processor;
use pricing::{Quote, price_lines, validate_lines};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Payment method stored on orders that did not succeed.
pub const NO_PAYMENT_METHOD: &str = "-";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("event {0} not found")]
    EventNotFound(EventId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("ticket class not found: {0}")]
    TicketClassNotFound(String),

    #[error(
        "insufficient stock for {label} (ticket class {ticket_class_id}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        ticket_class_id: TicketClassId,
        label: String,
        requested: u64,
        available: u32,
    },

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    #[error("deadline exceeded at phase {phase}")]
    DeadlineExceeded { phase: OrderPhase },

    /// A debit of `amount` could not be credited back to `buyer_id`.
    #[error("failed to credit {amount} back to user {buyer_id} after {cause}: {source}")]
    CompensationFailed {
        cause: OrderStatus,
        buyer_id: UserId,
        amount: Decimal,
        #[source]
        source: LedgerError,
    },

    #[error("storage fault: {0}")]
    Storage(#[from] StorageError),
}

impl OrderError {
    /// Status recorded on the order for this failure.
    pub fn status(&self) -> OrderStatus {
        match self {
            OrderError::InvalidRequest(_) => OrderStatus::InvalidRequest,
            OrderError::EventNotFound(_) => OrderStatus::EventNotFound,
            OrderError::UserNotFound(_) => OrderStatus::UserNotFound,
            OrderError::TicketClassNotFound(_) => OrderStatus::LineNotFound,
            OrderError::InsufficientStock { .. } => OrderStatus::InsufficientStock,
            OrderError::InsufficientBalance { .. } => OrderStatus::InsufficientBalance,
            OrderError::DeadlineExceeded { .. } => OrderStatus::DeadlineExceeded,
            OrderError::CompensationFailed { cause, .. } => *cause,
            OrderError::Storage(_) => OrderStatus::StorageFault,
        }
    }

    /// Whether state may be inconsistent and an operator has to look.
    pub fn needs_remediation(&self) -> bool {
        matches!(
            self,
            OrderError::CompensationFailed { .. } | OrderError::Storage(_)
        )
    }

    fn from_reserve(event_id: EventId, err: ReserveError) -> Self {
        match err {
            ReserveError::EventNotFound => OrderError::EventNotFound(event_id),
            ReserveError::TicketClassNotFound(selector) => OrderError::TicketClassNotFound(selector),
            ReserveError::InsufficientStock {
                ticket_class_id,
                label,
                requested,
                available,
            } => OrderError::InsufficientStock {
                ticket_class_id,
                label,
                requested,
                available,
            },
            ReserveError::Storage(e) => OrderError::Storage(e),
        }
    }

    fn from_debit(buyer_id: UserId, err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound => OrderError::UserNotFound(buyer_id),
            LedgerError::InsufficientBalance { balance, required } => {
                OrderError::InsufficientBalance { balance, required }
            }
            LedgerError::InvalidAmount(amount) => {
                OrderError::InvalidRequest(format!("cannot charge {amount}"))
            }
            LedgerError::Storage(e) => OrderError::Storage(e),
        }
    }
}

/// A failed purchase attempt: the order as recorded plus why it failed.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Rejected {
    pub order: Order,
    #[source]
    pub reason: OrderError,
}

/// Input for [`OrderEngine::place_order`].
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub buyer_id: UserId,
    pub event_id: EventId,
    pub lines: Vec<OrderLineRequest>,
    /// `None` applies the configured request timeout.
    pub deadline: Option<Instant>,
}

impl PlaceOrder {
    pub fn new(buyer_id: UserId, event_id: EventId, lines: Vec<OrderLineRequest>) -> Self {
        Self {
            buyer_id,
            event_id,
            lines,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// What is known about an attempt so far; becomes the journal entry.
struct Attempt {
    created_at: time::OffsetDateTime,
    buyer_id: UserId,
    buyer_name: Option<String>,
    event_id: EventId,
    event: Option<EventSnapshot>,
    lines: Vec<ResolvedLine>,
    total_price: Decimal,
}

impl Attempt {
    fn new(cmd: &PlaceOrder) -> Self {
        Self {
            created_at: time::OffsetDateTime::now_utc(),
            buyer_id: cmd.buyer_id,
            buyer_name: None,
            event_id: cmd.event_id,
            event: None,
            lines: Vec::new(),
            total_price: Decimal::ZERO,
        }
    }

    fn into_new_order(self, status: OrderStatus, payment_method: String) -> NewOrder {
        NewOrder {
            created_at: self.created_at,
            buyer_id: self.buyer_id,
            buyer_name: self.buyer_name,
            event_id: self.event_id,
            event: self.event,
            lines: self.lines,
            total_price: self.total_price,
            payment_method,
            status,
        }
    }
}

fn check_deadline(deadline: Instant, phase: OrderPhase) -> Result<(), OrderError> {
    if Instant::now() >= deadline {
        return Err(OrderError::DeadlineExceeded { phase });
    }
    Ok(())
}

/// Run a read-only lookup, giving up at the deadline.
async fn lookup_before<T, F>(deadline: Instant, phase: OrderPhase, fut: F) -> Result<T, OrderError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result.map_err(OrderError::from),
        Err(_) => Err(OrderError::DeadlineExceeded { phase }),
    }
}

#[derive(Clone)]
pub struct OrderEngine {
    catalog: Arc<dyn EventCatalog>,
    ledger: Arc<dyn AccountLedger>,
    journal: Arc<dyn OrderJournal>,
    settings: ConfigStore<OrderSettings>,
    reconciliation: Option<CompensationSender>,
}

impl OrderEngine {
    pub fn new(
        catalog: Arc<dyn EventCatalog>,
        ledger: Arc<dyn AccountLedger>,
        journal: Arc<dyn OrderJournal>,
        settings: ConfigStore<OrderSettings>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            journal,
            settings,
            reconciliation: None,
        }
    }

    /// Hand failed compensations to a reconciliation worker.
    pub fn with_reconciliation(mut self, sender: CompensationSender) -> Self {
        self.reconciliation = Some(sender);
        self
    }

    pub fn catalog(&self) -> &Arc<dyn EventCatalog> {
        &self.catalog
    }

    pub fn ledger(&self) -> &Arc<dyn AccountLedger> {
        &self.ledger
    }

    pub fn settings(&self) -> &ConfigStore<OrderSettings> {
        &self.settings
    }

    /// Place one order. Always journals exactly one order, and the order
    /// returned (in either arm) reflects the final state.
    #[tracing::instrument(skip_all, fields(buyer_id = %cmd.buyer_id, event_id = %cmd.event_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, Rejected> {
        let settings = self.settings.snapshot().await;
        let deadline = cmd
            .deadline
            .unwrap_or_else(|| Instant::now() + settings.request_timeout);
        let mut attempt = Attempt::new(&cmd);
        let outcome = self.run(&cmd, deadline, &settings, &mut attempt).await;
        self.finish(attempt, outcome, &settings).await
    }

    async fn run(
        &self,
        cmd: &PlaceOrder,
        deadline: Instant,
        settings: &OrderSettings,
        attempt: &mut Attempt,
    ) -> Result<(), OrderError> {
        validate_lines(&cmd.lines)?;
        check_deadline(deadline, OrderPhase::Started)?;

        let event = lookup_before(
            deadline,
            OrderPhase::Started,
            self.catalog.find_by_id(cmd.event_id),
        )
        .await?
        .ok_or(OrderError::EventNotFound(cmd.event_id))?;
        attempt.event = Some(event.snapshot());
        debug!(phase = %OrderPhase::EventResolved, "Event resolved");

        let buyer = lookup_before(
            deadline,
            OrderPhase::EventResolved,
            self.ledger.find_by_id(cmd.buyer_id),
        )
        .await?
        .ok_or(OrderError::UserNotFound(cmd.buyer_id))?;
        attempt.buyer_name = Some(buyer.name);

        let Quote { lines, total_price } = price_lines(&event, &cmd.lines)?;
        attempt.lines = lines.clone();
        attempt.total_price = total_price;
        debug!(phase = %OrderPhase::Priced, %total_price, "Order priced");

        check_deadline(deadline, OrderPhase::Priced)?;
        let balance = self
            .ledger
            .debit(cmd.buyer_id, total_price)
            .await
            .map_err(|e| OrderError::from_debit(cmd.buyer_id, e))?;
        debug!(phase = %OrderPhase::FundsReserved, %balance, "Buyer debited");

        // From here on every failure owes the buyer `total_price`.
        if let Err(expired) = check_deadline(deadline, OrderPhase::FundsReserved) {
            return Err(self
                .compensate(cmd.buyer_id, total_price, expired, settings)
                .await);
        }

        let canonical: Vec<OrderLineRequest> = lines
            .iter()
            .map(|l| OrderLineRequest::by_id(l.ticket_class_id, l.quantity))
            .collect();
        match self.catalog.reserve(cmd.event_id, &canonical).await {
            Ok(reserved) => {
                for (quoted, applied) in lines.iter().zip(&reserved) {
                    if quoted.unit_price != applied.unit_price {
                        warn!(
                            ticket_class_id = %quoted.ticket_class_id,
                            quoted = %quoted.unit_price,
                            current = %applied.unit_price,
                            "Unit price changed between pricing and reservation, keeping quoted price"
                        );
                    }
                }
                debug!(phase = %OrderPhase::StockReserved, "Stock reserved");
                Ok(())
            }
            Err(e) => {
                let reason = OrderError::from_reserve(cmd.event_id, e);
                Err(self
                    .compensate(cmd.buyer_id, total_price, reason, settings)
                    .await)
            }
        }
    }

    /// Credit back a debit and return the error the attempt ends with.
    async fn compensate(
        &self,
        buyer_id: UserId,
        amount: Decimal,
        reason: OrderError,
        settings: &OrderSettings,
    ) -> OrderError {
        warn!(%buyer_id, %amount, %reason, "Reversing debit");
        match retry_credit(self.ledger.as_ref(), buyer_id, amount, &settings.compensation).await {
            Ok(_) => reason,
            Err(source) => OrderError::CompensationFailed {
                cause: reason.status(),
                buyer_id,
                amount,
                source,
            },
        }
    }

    async fn finish(
        &self,
        attempt: Attempt,
        outcome: Result<(), OrderError>,
        settings: &OrderSettings,
    ) -> Result<Order, Rejected> {
        let (status, payment_method) = match &outcome {
            Ok(()) => (OrderStatus::Success, settings.payment_method.clone()),
            Err(e) => (e.status(), NO_PAYMENT_METHOD.to_string()),
        };
        let new_order = attempt.into_new_order(status, payment_method);

        match self.journal.record(new_order.clone()).await {
            Ok(order) => match outcome {
                Ok(()) => {
                    info!(
                        order_id = %order.id,
                        total_price = %order.total_price,
                        phase = %OrderPhase::Success,
                        "Order placed"
                    );
                    Ok(order)
                }
                Err(reason) => {
                    self.report(&order, &reason);
                    Err(Rejected { order, reason })
                }
            },
            Err(storage) => {
                let mut order = new_order.into_order(OrderId::UNRECORDED);
                error!(
                    status = %order.status,
                    buyer_id = %order.buyer_id,
                    total_price = %order.total_price,
                    error = %storage,
                    reconcile = true,
                    "Failed to record order"
                );
                if let Err(reason) = &outcome {
                    self.report(&order, reason);
                }
                order.status = OrderStatus::StorageFault;
                Err(Rejected {
                    order,
                    reason: OrderError::Storage(storage),
                })
            }
        }
    }

    fn report(&self, order: &Order, reason: &OrderError) {
        if !reason.needs_remediation() {
            info!(order_id = %order.id, status = %order.status, %reason, "Order rejected");
            return;
        }
        error!(order_id = %order.id, status = %order.status, %reason, reconcile = true, "Order needs reconciliation");
        if let OrderError::CompensationFailed {
            cause,
            buyer_id,
            amount,
            source,
        } = reason
        {
            if matches!(source, LedgerError::Storage(e) if !e.is_retry_safe()) {
                // a lost reply may hide an applied credit; repeating it could pay twice
                error!(
                    order_id = %order.id,
                    %buyer_id,
                    %amount,
                    reconcile = true,
                    "Compensation outcome unknown, verify the balance before crediting"
                );
                return;
            }
            self.enqueue(CompensationRequired {
                order_id: order.id,
                buyer_id: *buyer_id,
                amount: *amount,
                cause: *cause,
            });
        }
    }

    fn enqueue(&self, event: CompensationRequired) {
        let Some(sender) = &self.reconciliation else {
            error!(?event, "No reconciliation worker, compensation left to the operator");
            return;
        };
        if let Err(e) = sender.try_send(event) {
            error!(error = %e, "Failed to queue compensation for reconciliation");
        }
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StorageError> {
        self.journal.find_by_id(id).await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, StorageError> {
        self.journal.find_all().await
    }

    pub async fn list_orders_for_user(&self, buyer_id: UserId) -> Result<Vec<Order>, StorageError> {
        self.journal.find_all_by_user(buyer_id).await
    }
}

impl Processor<PlaceOrder> for OrderEngine {
    type Output = Order;
    type Error = Rejected;

    async fn process(&self, cmd: PlaceOrder) -> Result<Order, Rejected> {
        self.place_order(cmd).await
    }
}
