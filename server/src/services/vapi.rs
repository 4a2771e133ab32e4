// codcall_server/src/services/vapi.rs

//! Outbound calls through the Vapi REST API.

use crate::services::error_detail;
use async_trait::async_trait;
use codcall::payload::{CallRequest, PlacedCall};
use codcall::settings::VoiceCredentials;
use codcall::{CallError, VoiceProvider};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub struct VapiClient {
  http: reqwest::Client,
  base_url: String,
}

impl VapiClient {
  /// `timeout` bounds each request end to end.
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
    let http = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      http,
      base_url: base_url.into(),
    })
  }

  fn call_url(&self) -> String {
    format!("{}/call/phone", self.base_url)
  }
}

/// The `POST /call/phone` body. `phoneNumberId` is sent only when configured.
pub fn call_body(credentials: &VoiceCredentials, request: &CallRequest) -> JsonValue {
  let mut body = json!({
    "assistantId": credentials.assistant_id,
    "customer": { "number": request.customer_number },
    "assistantOverrides": { "variableValues": request.variables },
  });
  if let Some(phone_number_id) = &credentials.phone_number_id {
    body["phoneNumberId"] = json!(phone_number_id);
  }
  body
}

#[async_trait]
impl VoiceProvider for VapiClient {
  #[instrument(name = "VapiClient::place_call", skip_all)]
  async fn place_call(&self, credentials: &VoiceCredentials, request: &CallRequest) -> codcall::Result<PlacedCall> {
    let response = self
      .http
      .post(self.call_url())
      .bearer_auth(&credentials.api_key)
      .json(&call_body(credentials, request))
      .send()
      .await
      .map_err(|e| CallError::voice(format!("request failed: {}", e)))?;

    let status = response.status();
    let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
    if !status.is_success() {
      let detail = error_detail(&body);
      warn!(status = status.as_u16(), detail = %detail, "Vapi refused the call.");
      return Err(CallError::voice(format!("HTTP {}: {}", status.as_u16(), detail)));
    }

    let placed: PlacedCall =
      serde_json::from_value(body).map_err(|e| CallError::voice(format!("unexpected response: {}", e)))?;
    info!(provider_call_id = %placed.id, "Vapi call created.");
    Ok(placed)
  }
}
