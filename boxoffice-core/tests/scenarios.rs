mod common;

use boxoffice_core::engine::{NO_PAYMENT_METHOD, OrderError, PlaceOrder};
use boxoffice_core::entities::order::{OrderLineRequest, OrderStatus};
use boxoffice_core::entities::{EventId, OrderId, TicketClassId, UserId};
use common::{Fixture, balance_of, stock_of};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_vip_purchase_then_sold_out() {
    let fx = Fixture::new();
    let e1 = fx.event("E1", &[("VIP", 100, 2)]).await;
    let u1 = fx.account("U1", 250).await;
    let engine = fx.engine();

    let order = engine
        .place_order(PlaceOrder::new(
            u1.id,
            e1.id,
            vec![OrderLineRequest::by_label("VIP", 2)],
        ))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Success);
    assert_eq!(order.total_price, Decimal::from(200));
    assert_eq!(order.payment_method, "QRIS");
    assert_eq!(order.buyer_name.as_deref(), Some("U1"));
    assert_eq!(order.event.as_ref().map(|e| e.name.as_str()), Some("E1"));
    assert_eq!(balance_of(fx.ledger.as_ref(), u1.id).await, Decimal::from(50));
    assert_eq!(stock_of(fx.catalog.as_ref(), e1.id, "VIP").await, 0);

    let rejected = engine
        .place_order(PlaceOrder::new(
            u1.id,
            e1.id,
            vec![OrderLineRequest::by_label("VIP", 1)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        rejected.reason,
        OrderError::InsufficientStock { requested: 1, available: 0, .. }
    ));
    assert_eq!(rejected.order.status, OrderStatus::InsufficientStock);
    assert_eq!(rejected.order.payment_method, NO_PAYMENT_METHOD);
    assert_eq!(balance_of(fx.ledger.as_ref(), u1.id).await, Decimal::from(50));
}

#[tokio::test]
async fn test_insufficient_balance_touches_no_stock() {
    let fx = Fixture::new();
    let event = fx.event("E1", &[("VIP", 100, 2)]).await;
    let poor = fx.account("U2", 10).await;

    let rejected = fx
        .engine()
        .place_order(PlaceOrder::new(
            poor.id,
            event.id,
            vec![OrderLineRequest::by_label("VIP", 1)],
        ))
        .await
        .unwrap_err();
    assert_eq!(rejected.order.status, OrderStatus::InsufficientBalance);
    assert!(!rejected.reason.needs_remediation());
    // priced before the debit, so the quote is kept on the failed order
    assert_eq!(rejected.order.total_price, Decimal::from(100));
    assert_eq!(stock_of(fx.catalog.as_ref(), event.id, "VIP").await, 2);
    assert_eq!(balance_of(fx.ledger.as_ref(), poor.id).await, Decimal::from(10));
}

#[tokio::test]
async fn test_lookup_failures_are_recorded() {
    let fx = Fixture::new();
    let event = fx.event("E1", &[("VIP", 100, 2)]).await;
    let user = fx.account("U1", 250).await;
    let engine = fx.engine();
    let vip = || vec![OrderLineRequest::by_label("VIP", 1)];

    let no_event = engine
        .place_order(PlaceOrder::new(user.id, EventId(99), vip()))
        .await
        .unwrap_err();
    assert_eq!(no_event.order.status, OrderStatus::EventNotFound);
    assert!(no_event.order.event.is_none());

    let no_user = engine
        .place_order(PlaceOrder::new(UserId(99), event.id, vip()))
        .await
        .unwrap_err();
    assert_eq!(no_user.order.status, OrderStatus::UserNotFound);
    assert!(no_user.order.event.is_some());
    assert!(no_user.order.buyer_name.is_none());

    let no_line = engine
        .place_order(PlaceOrder::new(
            user.id,
            event.id,
            vec![OrderLineRequest::by_label("Balcony", 1)],
        ))
        .await
        .unwrap_err();
    assert_eq!(no_line.order.status, OrderStatus::LineNotFound);

    let all = engine.list_orders().await.unwrap();
    assert_eq!(
        all.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![OrderId(1), OrderId(2), OrderId(3)]
    );
    assert_eq!(balance_of(fx.ledger.as_ref(), user.id).await, Decimal::from(250));
    assert_eq!(stock_of(fx.catalog.as_ref(), event.id, "VIP").await, 2);
}

#[tokio::test]
async fn test_invalid_requests() {
    let fx = Fixture::new();
    let event = fx.event("E1", &[("VIP", 100, 2)]).await;
    let user = fx.account("U1", 250).await;
    let engine = fx.engine();

    let empty = engine
        .place_order(PlaceOrder::new(user.id, event.id, Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(empty.order.status, OrderStatus::InvalidRequest);

    let zero = engine
        .place_order(PlaceOrder::new(
            user.id,
            event.id,
            vec![OrderLineRequest::by_label("VIP", 0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(zero.reason, OrderError::InvalidRequest(_)));
    assert_eq!(balance_of(fx.ledger.as_ref(), user.id).await, Decimal::from(250));
}

#[tokio::test]
async fn test_success_mutates_exactly_once() {
    let fx = Fixture::new();
    let event = fx
        .event("Festival", &[("VIP", 120, 10), ("GA", 35, 100)])
        .await;
    let user = fx.account("Dewi", 1000).await;
    let engine = fx.engine();
    let ga_id = event.ticket_classes[1].id;

    let order = engine
        .place_order(PlaceOrder::new(
            user.id,
            event.id,
            vec![
                OrderLineRequest::by_label("VIP", 3),
                OrderLineRequest::by_id(ga_id, 4),
                // duplicate class lines are summed for the stock check
                OrderLineRequest::by_id(ga_id, 1),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(order.total_price, Decimal::from(3 * 120 + 5 * 35));
    assert_eq!(order.total_price, order.lines_total());
    assert_eq!(
        balance_of(fx.ledger.as_ref(), user.id).await,
        Decimal::from(1000 - 3 * 120 - 5 * 35)
    );
    assert_eq!(stock_of(fx.catalog.as_ref(), event.id, "VIP").await, 7);
    assert_eq!(stock_of(fx.catalog.as_ref(), event.id, "GA").await, 95);
}

#[tokio::test]
async fn test_id_wins_over_conflicting_label() {
    let fx = Fixture::new();
    let event = fx.event("E1", &[("VIP", 100, 5), ("GA", 20, 5)]).await;
    let user = fx.account("U1", 500).await;
    let ga_id = event.ticket_classes[1].id;

    let order = fx
        .engine()
        .place_order(PlaceOrder::new(
            user.id,
            event.id,
            vec![OrderLineRequest {
                ticket_class_id: Some(ga_id),
                label: Some("VIP".to_string()),
                quantity: 1,
            }],
        ))
        .await
        .unwrap();
    assert_eq!(order.lines[0].ticket_class_id, ga_id);
    assert_eq!(order.lines[0].label, "GA");
    assert_eq!(order.total_price, Decimal::from(20));
    assert_eq!(stock_of(fx.catalog.as_ref(), event.id, "VIP").await, 5);
}

#[tokio::test]
async fn test_reads_are_stable() {
    let fx = Fixture::new();
    let event = fx.event("E1", &[("VIP", 100, 5)]).await;
    let alice = fx.account("Alice", 500).await;
    let bob = fx.account("Bob", 500).await;
    let engine = fx.engine();

    let placed = engine
        .place_order(PlaceOrder::new(
            alice.id,
            event.id,
            vec![OrderLineRequest::by_id(TicketClassId(1), 2)],
        ))
        .await
        .unwrap();

    let first = engine.get_order(placed.id).await.unwrap().unwrap();
    let second = engine.get_order(placed.id).await.unwrap().unwrap();
    assert_eq!(first, placed);
    assert_eq!(first, second);
    assert_eq!(first.total_price, first.lines_total());

    assert_eq!(engine.list_orders_for_user(alice.id).await.unwrap().len(), 1);
    assert!(engine.list_orders_for_user(bob.id).await.unwrap().is_empty());
    assert!(engine.list_orders_for_user(UserId(404)).await.unwrap().is_empty());
    assert!(engine.get_order(OrderId(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_payment_method_follows_settings() {
    let fx = Fixture::new();
    let event = fx.event("E1", &[("VIP", 100, 5)]).await;
    let user = fx.account("U1", 500).await;
    let engine = fx.engine();

    let mut settings = engine.settings().snapshot().await;
    settings.payment_method = "CARD".to_string();
    engine.settings().update(settings).await;

    let order = engine
        .place_order(PlaceOrder::new(
            user.id,
            event.id,
            vec![OrderLineRequest::by_label("VIP", 1)],
        ))
        .await
        .unwrap();
    assert_eq!(order.payment_method, "CARD");
}
