use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::{
    AccountResponse, EventResponse, OrderResponse, PlaceOrderRequest, PlaceOrderResponse,
    TopUpRequest,
};

/// Typed HTTP client for the boxoffice server.
#[derive(Debug, Clone)]
pub struct BoxofficeClient {
    http: Client,
    base_url: Url,
}

impl BoxofficeClient {
    /// Create a new `BoxofficeClient`.
    ///
    /// * `base_url` – root URL of the server (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /orders` – place an order.
    ///
    /// Business rejections (insufficient stock, unknown event, ...) still
    /// return `Ok`: the recorded order is in `order` and the reason in `error`.
    pub async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, ClientError> {
        let url = self.base_url.join("/orders")?;
        let resp = self.http.post(url).json(request).send().await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        match serde_json::from_slice::<PlaceOrderResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ClientError::Api {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
            Err(e) => Err(ClientError::Json(e)),
        }
    }

    /// `GET /orders/{id}`
    pub async fn get_order(&self, order_id: i64) -> Result<OrderResponse, ClientError> {
        let url = self.base_url.join(&format!("/orders/{order_id}"))?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /orders`
    pub async fn list_orders(&self) -> Result<Vec<OrderResponse>, ClientError> {
        let url = self.base_url.join("/orders")?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /users/{id}/orders`
    pub async fn list_orders_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<OrderResponse>, ClientError> {
        let url = self.base_url.join(&format!("/users/{user_id}/orders"))?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /events/{id}`
    pub async fn get_event(&self, event_id: i64) -> Result<EventResponse, ClientError> {
        let url = self.base_url.join(&format!("/events/{event_id}"))?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /events/by-name/{name}`
    pub async fn find_event_by_name(&self, name: &str) -> Result<EventResponse, ClientError> {
        let path = format!("/events/by-name/{}", urlencoding::encode(name));
        let url = self.base_url.join(&path)?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /users/{id}`
    pub async fn get_account(&self, user_id: i64) -> Result<AccountResponse, ClientError> {
        let url = self.base_url.join(&format!("/users/{user_id}"))?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `POST /users/{id}/top-up` – credit the account balance.
    pub async fn top_up(
        &self,
        user_id: i64,
        amount: rust_decimal::Decimal,
    ) -> Result<AccountResponse, ClientError> {
        let url = self.base_url.join(&format!("/users/{user_id}/top-up"))?;
        let resp = self
            .http
            .post(url)
            .json(&TopUpRequest { amount })
            .send()
            .await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
