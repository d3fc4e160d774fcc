mod common;

use async_trait::async_trait;
use boxoffice_core::catalog::EventCatalog;
use boxoffice_core::engine::{OrderError, PlaceOrder};
use boxoffice_core::entities::account::{Account, NewAccount};
use boxoffice_core::entities::order::{OrderLineRequest, OrderStatus};
use boxoffice_core::entities::{TicketClassId, UserId};
use boxoffice_core::framework::StorageError;
use boxoffice_core::ledger::{AccountLedger, InMemoryAccountLedger, LedgerError};
use common::{Fixture, balance_of, engine_with, stock_of};
use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Barrier, Notify};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_ticket_is_sold_once() {
    for _ in 0..20 {
        let fx = Fixture::new();
        let event = fx.event("Finale", &[("VIP", 100, 1)]).await;
        let a = fx.account("A", 100).await;
        let b = fx.account("B", 100).await;
        let engine = fx.engine();
        let barrier = Arc::new(Barrier::new(2));
        let event_id = event.id;

        let handles = [a.id, b.id].map(|buyer| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .place_order(PlaceOrder::new(
                        buyer,
                        event_id,
                        vec![OrderLineRequest::by_label("VIP", 1)],
                    ))
                    .await
            })
        });
        let results: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(losers.len(), 1);
        assert!(matches!(losers[0].reason, OrderError::InsufficientStock { .. }));
        assert_eq!(stock_of(fx.catalog.as_ref(), event.id, "VIP").await, 0);

        let loser = losers[0].order.buyer_id;
        let winner = winners[0].buyer_id;
        assert_eq!(balance_of(fx.ledger.as_ref(), loser).await, Decimal::from(100));
        assert_eq!(balance_of(fx.ledger.as_ref(), winner).await, Decimal::ZERO);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_concurrent_orders_keep_invariants() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let fx = Fixture::new();
    let event = fx
        .event("Arena", &[("VIP", 75, 6), ("CAT 1", 40, 10), ("CAT 2", 15, 12)])
        .await;
    let other = fx.event("Club", &[("GA", 25, 4)]).await;

    let mut accounts = Vec::new();
    for i in 0..6 {
        let balance = rng.random_range(0..=300);
        accounts.push(fx.account(&format!("buyer-{i}"), balance).await);
    }
    let initial_balances: HashMap<UserId, Decimal> =
        accounts.iter().map(|a| (a.id, a.balance)).collect();
    let initial_stock: HashMap<TicketClassId, u32> = event
        .ticket_classes
        .iter()
        .chain(&other.ticket_classes)
        .map(|c| (c.id, c.stock))
        .collect();

    let engine = fx.engine();
    let mut handles = Vec::new();
    for _ in 0..80 {
        let buyer = accounts[rng.random_range(0..accounts.len())].id;
        let target = if rng.random_bool(0.8) { &event } else { &other };
        let line_count = rng.random_range(1..=2);
        let lines: Vec<_> = (0..line_count)
            .map(|_| {
                let class = &target.ticket_classes[rng.random_range(0..target.ticket_classes.len())];
                OrderLineRequest::by_id(class.id, rng.random_range(1..=3))
            })
            .collect();
        let engine = engine.clone();
        let event_id = target.id;
        handles.push(tokio::spawn(async move {
            engine
                .place_order(PlaceOrder::new(buyer, event_id, lines))
                .await
        }));
    }
    for handle in join_all(handles).await {
        match handle.unwrap() {
            Ok(order) => assert_eq!(order.status, OrderStatus::Success),
            Err(rejected) => {
                assert!(!rejected.reason.needs_remediation());
                assert!(matches!(
                    rejected.order.status,
                    OrderStatus::InsufficientStock | OrderStatus::InsufficientBalance
                ));
            }
        }
    }

    // Replay the journal: only successful orders may have moved anything.
    let orders = engine.list_orders().await.unwrap();
    assert_eq!(orders.len(), 80);
    let mut spent: HashMap<UserId, Decimal> = HashMap::new();
    let mut sold: HashMap<TicketClassId, u32> = HashMap::new();
    for order in orders.iter().filter(|o| o.is_success()) {
        assert_eq!(order.total_price, order.lines_total());
        *spent.entry(order.buyer_id).or_default() += order.total_price;
        for line in &order.lines {
            *sold.entry(line.ticket_class_id).or_default() += line.quantity;
        }
    }
    for account in &accounts {
        let balance = balance_of(fx.ledger.as_ref(), account.id).await;
        assert!(balance >= Decimal::ZERO);
        let expected = initial_balances[&account.id] - spent.get(&account.id).copied().unwrap_or_default();
        assert_eq!(balance, expected);
    }
    for e in [&event, &other] {
        let current = fx.catalog.find_by_id(e.id).await.unwrap().unwrap();
        for class in current.ticket_classes {
            let sold = sold.get(&class.id).copied().unwrap_or(0);
            assert_eq!(class.stock + sold, initial_stock[&class.id]);
        }
    }
}

/// Holds one buyer's debit open until released, so another order can win
/// the stock in between.
struct GatedLedger {
    inner: InMemoryAccountLedger,
    gated: UserId,
    debited: Notify,
    release: Notify,
}

#[async_trait]
impl AccountLedger for GatedLedger {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StorageError> {
        self.inner.find_by_id(id).await
    }

    async fn debit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let result = self.inner.debit(id, amount).await;
        if id == self.gated {
            self.debited.notify_one();
            self.release.notified().await;
        }
        result
    }

    async fn credit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.inner.credit(id, amount).await
    }
}

#[tokio::test]
async fn test_loser_is_credited_back_after_concurrent_winner() {
    let fx = Fixture::new();
    let event = fx.event("Finale", &[("VIP", 100, 1)]).await;
    let event_id = event.id;

    let inner = InMemoryAccountLedger::new();
    let slow = inner
        .insert(NewAccount {
            name: "Slow".to_string(),
            balance: Decimal::from(150),
        })
        .await
        .id;
    let fast = inner
        .insert(NewAccount {
            name: "Fast".to_string(),
            balance: Decimal::from(150),
        })
        .await
        .id;
    let ledger = Arc::new(GatedLedger {
        inner,
        gated: slow,
        debited: Notify::new(),
        release: Notify::new(),
    });
    let engine = engine_with(fx.catalog.clone(), ledger.clone(), fx.journal.clone());

    let slow_order = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .place_order(PlaceOrder::new(
                    slow,
                    event_id,
                    vec![OrderLineRequest::by_label("VIP", 1)],
                ))
                .await
        })
    };

    ledger.debited.notified().await;
    assert_eq!(balance_of(ledger.as_ref(), slow).await, Decimal::from(50));

    let winner = engine
        .place_order(PlaceOrder::new(
            fast,
            event_id,
            vec![OrderLineRequest::by_label("VIP", 1)],
        ))
        .await
        .unwrap();
    assert_eq!(winner.status, OrderStatus::Success);

    ledger.release.notify_one();
    let rejected = slow_order.await.unwrap().unwrap_err();
    assert_eq!(rejected.order.status, OrderStatus::InsufficientStock);
    assert!(!rejected.reason.needs_remediation());
    assert_eq!(balance_of(ledger.as_ref(), slow).await, Decimal::from(150));
    assert_eq!(balance_of(ledger.as_ref(), fast).await, Decimal::from(50));
    assert_eq!(stock_of(fx.catalog.as_ref(), event_id, "VIP").await, 0);
}
