//! Request validation and pricing against an event snapshot.

use super::OrderError;
use crate::entities::event::Event;
use crate::entities::order::{OrderLineRequest, ResolvedLine};
use rust_decimal::Decimal;

/// Reject requests that cannot describe a purchase.
pub fn validate_lines(lines: &[OrderLineRequest]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::InvalidRequest("no ticket lines".to_string()));
    }
    for line in lines {
        if line.ticket_class_id.is_none() && line.label.is_none() {
            return Err(OrderError::InvalidRequest(
                "line has neither ticket class id nor label".to_string(),
            ));
        }
        if line.quantity == 0 {
            return Err(OrderError::InvalidRequest(format!(
                "zero quantity for {}",
                line.selector()
            )));
        }
    }
    Ok(())
}

/// Priced request: one resolved line per requested line, plus the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub lines: Vec<ResolvedLine>,
    pub total_price: Decimal,
}

/// Price every line from the snapshot's current unit prices.
pub fn price_lines(event: &Event, lines: &[OrderLineRequest]) -> Result<Quote, OrderError> {
    let mut resolved = Vec::with_capacity(lines.len());
    let mut total_price = Decimal::ZERO;
    for line in lines {
        let class = event
            .find_ticket_class(line)
            .ok_or_else(|| OrderError::TicketClassNotFound(line.selector()))?;
        let line_total = class
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|t| t.checked_add(total_price))
            .ok_or_else(|| OrderError::InvalidRequest("total price overflows".to_string()))?;
        total_price = line_total;
        resolved.push(ResolvedLine {
            ticket_class_id: class.id,
            label: class.label.clone(),
            quantity: line.quantity,
            unit_price: class.unit_price,
        });
    }
    Ok(Quote {
        lines: resolved,
        total_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::event::TicketClass;
    use crate::entities::{EventId, TicketClassId};

    fn event() -> Event {
        Event {
            id: EventId(1),
            name: "E1".to_string(),
            date: time::macros::datetime!(2026-06-01 20:00),
            location: "Arena".to_string(),
            description: String::new(),
            ticket_classes: vec![
                TicketClass {
                    id: TicketClassId(1),
                    label: "VIP".to_string(),
                    unit_price: Decimal::from(100),
                    stock: 2,
                },
                TicketClass {
                    id: TicketClassId(2),
                    label: "Regular".to_string(),
                    unit_price: Decimal::new(2550, 2),
                    stock: 0,
                },
            ],
        }
    }

    #[test]
    fn test_price_sums_lines() {
        let quote = price_lines(
            &event(),
            &[
                OrderLineRequest::by_label("VIP", 2),
                OrderLineRequest::by_id(TicketClassId(2), 3),
            ],
        )
        .unwrap();
        assert_eq!(quote.total_price, Decimal::new(27650, 2));
        assert_eq!(quote.lines[1].label, "Regular");
    }

    #[test]
    fn test_pricing_ignores_stock() {
        // stock is checked by the reservation, not here
        let quote = price_lines(&event(), &[OrderLineRequest::by_label("Regular", 1)]).unwrap();
        assert_eq!(quote.total_price, Decimal::new(2550, 2));
    }

    #[test]
    fn test_unknown_line() {
        let err = price_lines(&event(), &[OrderLineRequest::by_label("Floor", 1)]).unwrap_err();
        assert!(matches!(err, OrderError::TicketClassNotFound(_)));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(validate_lines(&[]), Err(OrderError::InvalidRequest(_))));
        assert!(matches!(
            validate_lines(&[OrderLineRequest::by_label("VIP", 0)]),
            Err(OrderError::InvalidRequest(_))
        ));
        let blank = OrderLineRequest {
            ticket_class_id: None,
            label: None,
            quantity: 1,
        };
        assert!(validate_lines(&[blank]).is_err());
        assert!(validate_lines(&[OrderLineRequest::by_label("VIP", 1)]).is_ok());
    }
}
