// codcall/src/payload/vapi.rs

//! Vapi payloads: the outbound call request variables, the end-of-call
//! report, and in-call tool invocations.
//!
//! Reports and tool calls are read leniently from `serde_json::Value` because
//! the provider wraps them differently depending on the event source.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

/// Variables bound into the assistant's script. Keys are the template names
/// the assistant prompt uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallVariables {
  #[serde(rename = "nombre_cliente")]
  pub customer_name: String,
  #[serde(rename = "numero_pedido")]
  pub order_number: String,
  #[serde(rename = "producto")]
  pub product: String,
  #[serde(rename = "importe")]
  pub amount: String,
  #[serde(rename = "direccion")]
  pub address: String,
  #[serde(rename = "tienda")]
  pub store_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
  pub customer_number: String,
  pub variables: CallVariables,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedCall {
  pub id: String,
  #[serde(default)]
  pub status: Option<String>,
}

fn str_at<'a>(value: &'a JsonValue, key: &str) -> Option<&'a str> {
  value.get(key).and_then(JsonValue::as_str).filter(|s| !s.is_empty())
}

fn num_at(value: &JsonValue, key: &str) -> Option<f64> {
  value.get(key).and_then(JsonValue::as_f64).filter(|n| *n != 0.0)
}

/// The envelope most events arrive in is `{ "message": { ... } }`; bare bodies
/// are accepted as the message itself.
fn unwrap_message(body: &JsonValue) -> &JsonValue {
  match body.get("message") {
    Some(message) if message.is_object() => message,
    _ => body,
  }
}

/// End-of-call report, flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionReport {
  pub report_type: Option<String>,
  pub provider_call_id: String,
  /// Lower-cased; booleans become `"true"`/`"false"`.
  pub success_evaluation: String,
  pub ended_reason: String,
  pub transcript: String,
  pub summary: String,
  /// `analysis.structuredData.new_address`, when the assistant extracted one.
  pub structured_new_address: Option<String>,
  pub duration_seconds: f64,
  pub cost: f64,
  pub recording_url: String,
}

impl CompletionReport {
  pub const COMPLETION_TYPE: &'static str = "end-of-call-report";

  pub fn from_json(body: &JsonValue) -> Self {
    let message = unwrap_message(body);
    let empty = JsonValue::Null;
    let call = message.get("call").unwrap_or(&empty);
    let analysis = message.get("analysis").unwrap_or(&empty);

    let success_evaluation = analysis
      .get("successEvaluation")
      .filter(|v| !v.is_null())
      .or_else(|| message.get("successEvaluation"))
      .map(|v| match v {
        JsonValue::String(s) => s.to_lowercase(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => String::new(),
      })
      .unwrap_or_default();

    Self {
      report_type: str_at(message, "type").map(str::to_string),
      provider_call_id: str_at(call, "id")
        .or_else(|| str_at(message, "callId"))
        .unwrap_or_default()
        .to_string(),
      success_evaluation,
      ended_reason: str_at(message, "endedReason")
        .or_else(|| str_at(call, "endedReason"))
        .unwrap_or_default()
        .to_string(),
      transcript: str_at(message, "transcript").unwrap_or_default().to_string(),
      summary: str_at(message, "summary").unwrap_or_default().to_string(),
      structured_new_address: analysis
        .get("structuredData")
        .and_then(|data| str_at(data, "new_address"))
        .map(str::to_string),
      duration_seconds: num_at(message, "durationSeconds")
        .or_else(|| num_at(call, "durationSeconds"))
        .unwrap_or(0.0),
      cost: num_at(message, "cost").or_else(|| num_at(call, "cost")).unwrap_or(0.0),
      recording_url: str_at(message, "recordingUrl")
        .or_else(|| str_at(call, "recordingUrl"))
        .unwrap_or_default()
        .to_string(),
    }
  }

  /// Reports without a type are treated as completions.
  pub fn is_completion(&self) -> bool {
    self.report_type.as_deref().map_or(true, |t| t == Self::COMPLETION_TYPE)
  }
}

/// A structured decision reported by the assistant while the call is live.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
  pub id: String,
  pub function_name: String,
  pub arguments: Map<String, JsonValue>,
  pub provider_call_id: Option<String>,
}

impl ToolCall {
  /// Accepts the three shapes the provider uses: a `tool-calls` message with
  /// `toolCallList`, any message carrying `toolCallList`, or a direct
  /// `functionCall` / `function_call` body. `None` if no tool call is present.
  pub fn from_json(body: &JsonValue) -> Option<Self> {
    let message = unwrap_message(body);
    let message_call_id = message.get("call").and_then(|c| str_at(c, "id"));

    let (entry, provider_call_id) = if let Some(list) = message.get("toolCallList").and_then(JsonValue::as_array) {
      let call_id = if str_at(message, "type") == Some("tool-calls") {
        message_call_id
      } else {
        message_call_id.or_else(|| body.get("call").and_then(|c| str_at(c, "id")))
      };
      (list.first()?.clone(), call_id)
    } else if let Some(function) = body.get("functionCall").or_else(|| body.get("function_call")) {
      let entry = json!({
        "id": str_at(body, "toolCallId").unwrap_or("direct"),
        "function": function,
      });
      let call_id = body
        .get("call")
        .and_then(|c| str_at(c, "id"))
        .or_else(|| str_at(body, "callId"));
      (entry, call_id)
    } else {
      return None;
    };

    let function = entry.get("function").cloned().unwrap_or(JsonValue::Null);
    let arguments = match function.get("arguments") {
      Some(JsonValue::String(raw)) => serde_json::from_str::<Map<String, JsonValue>>(raw).unwrap_or_default(),
      Some(JsonValue::Object(map)) => map.clone(),
      _ => Map::new(),
    };

    Some(Self {
      id: str_at(&entry, "id").unwrap_or_default().to_string(),
      function_name: str_at(&function, "name").unwrap_or_default().to_string(),
      arguments,
      provider_call_id: provider_call_id.map(str::to_string),
    })
  }

  fn argument(&self, keys: &[&str]) -> String {
    keys
      .iter()
      .find_map(|key| self.arguments.get(*key).and_then(JsonValue::as_str).filter(|s| !s.is_empty()))
      .unwrap_or_default()
      .to_string()
  }

  /// `resultado`, falling back to `result`.
  pub fn decision(&self) -> String {
    self.argument(&["resultado", "result"])
  }

  /// `nueva_direccion`, falling back to `new_address`.
  pub fn new_address(&self) -> String {
    self.argument(&["nueva_direccion", "new_address"])
  }
}

/// Reply the provider reads back to the assistant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReply {
  #[serde(rename = "toolCallId")]
  pub tool_call_id: String,
  pub result: String,
}

impl ToolReply {
  pub fn new(tool_call_id: impl Into<String>, result: impl Into<String>) -> Self {
    Self {
      tool_call_id: tool_call_id.into(),
      result: result.into(),
    }
  }

  pub fn to_body(&self) -> JsonValue {
    json!({ "results": [self] })
  }
}
