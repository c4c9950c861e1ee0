//! The outbound notification transport `cse-notifier::NotificationSender`
//! leaves for a server binary to implement (its own doc comment says as
//! much): plain `reqwest` POSTs of the `m2m:sgn`/`m2m:agn` envelope to the
//! subscriber's `nu` URI, grounded on `HttpCseForwarder`'s request style.

use async_trait::async_trait;
use cse_core::error::CseResult;
use cse_core::rsc::ResponseStatusCode;
use cse_notifier::{DeliveryOutcome, NotificationSender};
use serde_json::Value;

pub struct HttpNotificationSender {
    client: reqwest::Client,
}

impl HttpNotificationSender {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HttpNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSender for HttpNotificationSender {
    async fn send(&self, uri: &str, payload: &Value) -> CseResult<DeliveryOutcome> {
        let response = match self.client.post(uri).json(payload).send().await {
            Ok(r) => r,
            Err(err) if err.is_timeout() || err.is_connect() => return Ok(DeliveryOutcome::TargetNotReachable),
            Err(err) => {
                return Err(cse_core::error::CseError::new(ResponseStatusCode::TargetNotReachable, err.to_string()));
            }
        };

        if response.status().is_success() {
            Ok(DeliveryOutcome::Delivered)
        } else if response.status() == reqwest::StatusCode::FORBIDDEN {
            Ok(DeliveryOutcome::OperationNotAllowed)
        } else {
            Ok(DeliveryOutcome::TargetNotReachable)
        }
    }
}
