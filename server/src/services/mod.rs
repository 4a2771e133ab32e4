// codcall_server/src/services/mod.rs

pub mod shopify;
pub mod vapi;

pub use shopify::ShopifyClient;
pub use vapi::VapiClient;

use serde_json::Value as JsonValue;

/// Human-readable detail from a provider error body: its `message` (string or
/// list) or `error` field, else the raw body.
pub(crate) fn error_detail(body: &JsonValue) -> String {
  let field = |key: &str| match body.get(key) {
    Some(JsonValue::String(s)) => Some(s.clone()),
    Some(JsonValue::Array(items)) => Some(
      items
        .iter()
        .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
        .collect::<Vec<_>>()
        .join("; "),
    ),
    _ => None,
  };
  field("message")
    .or_else(|| field("errors"))
    .or_else(|| field("error"))
    .unwrap_or_else(|| body.to_string())
}
