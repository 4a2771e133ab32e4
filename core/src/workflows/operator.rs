// codcall/src/workflows/operator.rs

//! Actions an operator triggers from the dashboard: manual order edits and
//! test calls.

use crate::error::{CallError, Result};
use crate::model::{Order, OrderEvent, OrderPatch, OrderStatus};
use crate::payload::{CallRequest, CallVariables, PlacedCall};
use crate::settings::{Settings, VoiceCredentials};
use crate::workflows::CallFlow;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};
use uuid::Uuid;

pub const PHONE_REQUIRED: &str = "El teléfono es obligatorio";
pub const VOICE_NOT_CONFIGURED: &str =
  "Vapi no está configurado. Configura la API Key, el ID del Asistente y el Phone Number ID en Configuración.";

/// Fields an operator may change on an order. Everything else is owned by the
/// workflows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperatorUpdate {
  #[serde(default)]
  pub status: Option<OrderStatus>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub address_corrected: Option<String>,
}

/// A test call with caller-supplied script variables. Blank fields take
/// sample values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestCallRequest {
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub customer_name: Option<String>,
  #[serde(default)]
  pub order_number: Option<String>,
  #[serde(default)]
  pub product: Option<String>,
  /// Accepted as a string or a number.
  #[serde(default)]
  pub amount: Option<JsonValue>,
  #[serde(default)]
  pub address: Option<String>,
  #[serde(default)]
  pub store_name: Option<String>,
}

fn or_sample(value: Option<String>, sample: &str) -> String {
  value.filter(|v| !v.trim().is_empty()).unwrap_or_else(|| sample.to_string())
}

impl TestCallRequest {
  fn variables(self) -> CallVariables {
    let amount = match self.amount {
      Some(JsonValue::String(s)) if !s.trim().is_empty() => s,
      Some(JsonValue::Number(n)) => n.to_string(),
      _ => "29.99".to_string(),
    };
    CallVariables {
      customer_name: or_sample(self.customer_name, "Cliente de Prueba"),
      order_number: or_sample(self.order_number, "#TEST-001"),
      product: or_sample(self.product, "Producto de Ejemplo"),
      amount,
      address: or_sample(self.address, "Calle de Prueba 123, Madrid"),
      store_name: or_sample(self.store_name, "Mi Tienda Test"),
    }
  }
}

impl CallFlow {
  /// Places a call that touches no order or attempt. Unlike dispatch, the
  /// phone-number id is required here.
  #[instrument(name = "CallFlow::place_test_call", skip_all)]
  pub async fn place_test_call(&self, request: TestCallRequest, settings: &Settings) -> Result<PlacedCall> {
    let phone = request
      .phone
      .clone()
      .map(|p| p.trim().to_string())
      .filter(|p| !p.is_empty())
      .ok_or_else(|| CallError::Validation(PHONE_REQUIRED.to_string()))?;

    let credentials = match settings.voice_credentials() {
      Some(creds @ VoiceCredentials { phone_number_id: Some(_), .. }) => creds,
      _ => return Err(CallError::Validation(VOICE_NOT_CONFIGURED.to_string())),
    };

    let call = CallRequest {
      customer_number: phone,
      variables: request.variables(),
    };
    let placed = self.deps.voice.place_call(&credentials, &call).await?;
    info!(provider_call_id = %placed.id, "Test call placed.");
    Ok(placed)
  }

  /// Applies an operator edit. A status change goes through the state
  /// machine as an override.
  #[instrument(name = "CallFlow::override_order", skip(self, update))]
  pub async fn override_order(&self, order_id: Uuid, update: OperatorUpdate) -> Result<Order> {
    let storage = &self.deps.storage;
    let order = storage
      .get_order(order_id)
      .await?
      .ok_or_else(|| CallError::NotFound(format!("Order {} not found", order_id)))?;

    let mut patch = OrderPatch::default();
    if let Some(target) = update.status {
      // Only the dispatcher may put an order in a call; it also opens the attempt.
      if target == OrderStatus::InCall {
        return Err(CallError::Validation(format!("Status '{}' cannot be set manually", target)));
      }
      patch.status = Some(order.status.apply(OrderEvent::OperatorOverride(target))?);
    }
    patch.notes = update.notes;
    patch.address_corrected = update.address_corrected;
    if patch.is_empty() {
      return Err(CallError::Validation("No updatable fields given".to_string()));
    }

    let updated = storage
      .update_order(order_id, &patch)
      .await?
      .ok_or_else(|| CallError::NotFound(format!("Order {} not found", order_id)))?;
    info!(from = %order.status, to = %updated.status, "Order edited by operator.");
    Ok(updated)
  }
}
