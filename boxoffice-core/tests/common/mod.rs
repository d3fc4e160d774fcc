#![allow(dead_code)]

use boxoffice_core::catalog::{EventCatalog, InMemoryEventCatalog};
use boxoffice_core::config::{CompensationPolicy, ConfigStore, OrderSettings};
use boxoffice_core::engine::OrderEngine;
use boxoffice_core::entities::account::{Account, NewAccount};
use boxoffice_core::entities::event::{Event, NewEvent, NewTicketClass};
use boxoffice_core::entities::{EventId, UserId};
use boxoffice_core::journal::{InMemoryOrderJournal, OrderJournal};
use boxoffice_core::ledger::{AccountLedger, InMemoryAccountLedger};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

pub struct Fixture {
    pub catalog: Arc<InMemoryEventCatalog>,
    pub ledger: Arc<InMemoryAccountLedger>,
    pub journal: Arc<InMemoryOrderJournal>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(InMemoryEventCatalog::new()),
            ledger: Arc::new(InMemoryAccountLedger::new()),
            journal: Arc::new(InMemoryOrderJournal::new()),
        }
    }

    pub fn engine(&self) -> OrderEngine {
        engine_with(self.catalog.clone(), self.ledger.clone(), self.journal.clone())
    }

    pub async fn event(&self, name: &str, classes: &[(&str, i64, u32)]) -> Event {
        self.catalog.insert(new_event(name, classes)).await
    }

    pub async fn account(&self, name: &str, balance: i64) -> Account {
        self.ledger
            .insert(NewAccount {
                name: name.to_string(),
                balance: Decimal::from(balance),
            })
            .await
    }
}

pub fn settings() -> ConfigStore<OrderSettings> {
    ConfigStore::new(OrderSettings {
        compensation: CompensationPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        ..OrderSettings::default()
    })
}

pub fn engine_with(
    catalog: Arc<dyn EventCatalog>,
    ledger: Arc<dyn AccountLedger>,
    journal: Arc<dyn OrderJournal>,
) -> OrderEngine {
    OrderEngine::new(catalog, ledger, journal, settings())
}

pub fn new_event(name: &str, classes: &[(&str, i64, u32)]) -> NewEvent {
    NewEvent {
        name: name.to_string(),
        date: time::macros::datetime!(2026-07-04 19:30),
        location: "Jakarta Convention Center".to_string(),
        description: format!("{name} live"),
        ticket_classes: classes
            .iter()
            .map(|(label, price, stock)| NewTicketClass {
                label: label.to_string(),
                unit_price: Decimal::from(*price),
                stock: *stock,
            })
            .collect(),
    }
}

pub async fn stock_of(catalog: &dyn EventCatalog, event_id: EventId, label: &str) -> u32 {
    let event = catalog.find_by_id(event_id).await.unwrap().unwrap();
    event
        .ticket_classes
        .iter()
        .find(|c| c.label == label)
        .map(|c| c.stock)
        .unwrap()
}

pub async fn balance_of(ledger: &dyn AccountLedger, user_id: UserId) -> Decimal {
    ledger.find_by_id(user_id).await.unwrap().unwrap().balance
}
