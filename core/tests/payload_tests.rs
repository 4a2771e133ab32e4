// tests/payload_tests.rs

use codcall::payload::{CompletionReport, RawOrder, ToolCall, ToolReply};
use serde_json::json;

#[test]
fn test_webhook_order_deserializes_and_normalises() {
  let raw: RawOrder = serde_json::from_value(json!({
    "id": 5501,
    "name": "#1042",
    "order_number": 1042,
    "payment_gateway_names": ["Cash on Delivery (COD)"],
    "shipping_address": null,
    "billing_address": {
      "first_name": "Pablo",
      "last_name": "",
      "address1": "Avenida de la Paz 9",
      "address2": "",
      "city": "Valencia",
      "zip": "46001",
      "phone": "+34611222333"
    },
    "line_items": [{ "title": "Sudadera", "quantity": 1 }, { "title": "Calcetines" }],
    "total_price": 30,
    "unknown_field": { "ignored": true }
  }))
  .unwrap();

  assert_eq!(raw.customer_name(), "Pablo");
  assert_eq!(raw.customer_phone(), "+34611222333");
  assert_eq!(raw.display_address(), "Avenida de la Paz 9, Valencia, 46001");
  assert_eq!(raw.product_description(), "Sudadera, Calcetines");
  assert_eq!(raw.amount(), 30.0);
  assert_eq!(raw.currency_code(), "EUR");
  assert_eq!(raw.order_number_display(), "#1042");
}

#[test]
fn test_order_number_display_fallbacks() {
  let raw = RawOrder {
    id: Some(77),
    order_number: Some(1077),
    ..Default::default()
  };
  assert_eq!(raw.order_number_display(), "#1077");

  let raw = RawOrder {
    id: Some(77),
    ..Default::default()
  };
  assert_eq!(raw.order_number_display(), "#77");
}

#[test]
fn test_completion_report_reads_nested_call_fields() {
  let report = CompletionReport::from_json(&json!({
    "message": {
      "type": "end-of-call-report",
      "call": {
        "id": "call-9",
        "endedReason": "customer-busy",
        "durationSeconds": 12,
        "cost": 0.05,
        "recordingUrl": "https://rec/9"
      },
      "analysis": { "successEvaluation": true }
    }
  }));

  assert!(report.is_completion());
  assert_eq!(report.provider_call_id, "call-9");
  assert_eq!(report.success_evaluation, "true");
  assert_eq!(report.ended_reason, "customer-busy");
  assert_eq!(report.duration_seconds, 12.0);
  assert_eq!(report.cost, 0.05);
  assert_eq!(report.recording_url, "https://rec/9");
  assert_eq!(report.structured_new_address, None);
}

#[test]
fn test_completion_report_without_type_counts_as_completion() {
  let report = CompletionReport::from_json(&json!({ "callId": "call-1", "successEvaluation": "Success" }));
  assert!(report.is_completion());
  assert_eq!(report.provider_call_id, "call-1");
  assert_eq!(report.success_evaluation, "success");

  let report = CompletionReport::from_json(&json!({ "message": { "type": "transcript" } }));
  assert!(!report.is_completion());
}

#[test]
fn test_tool_call_from_tool_calls_message() {
  let call = ToolCall::from_json(&json!({
    "message": {
      "type": "tool-calls",
      "call": { "id": "call-1" },
      "toolCallList": [{
        "id": "tc-7",
        "function": {
          "name": "actualizar_pedido",
          "arguments": "{\"resultado\":\"confirmado\",\"nueva_direccion\":\"Calle Sol 3\"}"
        }
      }]
    }
  }))
  .unwrap();

  assert_eq!(call.id, "tc-7");
  assert_eq!(call.function_name, "actualizar_pedido");
  assert_eq!(call.provider_call_id.as_deref(), Some("call-1"));
  assert_eq!(call.decision(), "confirmado");
  assert_eq!(call.new_address(), "Calle Sol 3");
}

#[test]
fn test_tool_call_with_object_arguments_and_outer_call_id() {
  let call = ToolCall::from_json(&json!({
    "message": {
      "toolCallList": [{
        "id": "tc-8",
        "function": { "name": "actualizar_pedido", "arguments": { "result": "rechazado" } }
      }]
    },
    "call": { "id": "call-outer" }
  }))
  .unwrap();

  assert_eq!(call.provider_call_id.as_deref(), Some("call-outer"));
  assert_eq!(call.decision(), "rechazado");
  assert_eq!(call.new_address(), "");
}

#[test]
fn test_direct_function_call_and_bad_arguments() {
  let call = ToolCall::from_json(&json!({
    "functionCall": { "name": "actualizar_pedido", "arguments": "not json" },
    "callId": "call-3"
  }))
  .unwrap();

  assert_eq!(call.id, "direct");
  assert_eq!(call.provider_call_id.as_deref(), Some("call-3"));
  assert!(call.arguments.is_empty());
  assert_eq!(call.decision(), "");
}

#[test]
fn test_body_without_tool_call() {
  assert!(ToolCall::from_json(&json!({ "message": { "type": "status-update" } })).is_none());
  assert!(ToolCall::from_json(&json!({ "message": { "type": "tool-calls", "toolCallList": [] } })).is_none());
}

#[test]
fn test_tool_reply_body() {
  let body = ToolReply::new("tc-1", "Pedido #1001 confirmado correctamente").to_body();
  assert_eq!(
    body,
    json!({ "results": [{ "toolCallId": "tc-1", "result": "Pedido #1001 confirmado correctamente" }] })
  );
}
