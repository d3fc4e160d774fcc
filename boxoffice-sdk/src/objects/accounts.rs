//! Account read models and balance top-up payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub name: String,
    pub balance: rust_decimal::Decimal,
}

/// Request payload for `POST /users/{id}/top-up`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub amount: rust_decimal::Decimal,
}
