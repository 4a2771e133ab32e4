// codcall/src/rules/outcome.rs

//! Classification of an end-of-call report.

use crate::model::CallResult;

/// Transcript fragments that mean the customer asked to change the delivery
/// address.
pub const ADDRESS_CHANGE_KEYWORDS: [&str; 4] = ["cambiar", "nueva dirección", "correg", "no es correcta"];

/// Classifies a call from the assistant's success evaluation, then lets the
/// ended reason override it: voicemail forces `buzon`, no-answer and
/// failed-to-connect force `no_contesta`.
///
/// `success_evaluation` is compared case-insensitively.
pub fn classify_result(success_evaluation: &str, ended_reason: &str) -> CallResult {
  let evaluation = success_evaluation.to_lowercase();
  let mut result = if evaluation.contains("success") || evaluation == "true" {
    CallResult::Confirmed
  } else if evaluation.contains("fail") || evaluation == "false" {
    CallResult::Rejected
  } else if evaluation.contains("callback") {
    CallResult::Callback
  } else {
    CallResult::NoAnswer
  };

  if ended_reason.contains("voicemail") {
    result = CallResult::Voicemail;
  }
  if ended_reason.contains("no-answer") || ended_reason.contains("failed-to-connect") {
    result = CallResult::NoAnswer;
  }
  result
}

pub fn requests_address_change(transcript: &str) -> bool {
  let transcript = transcript.to_lowercase();
  ADDRESS_CHANGE_KEYWORDS.iter().any(|keyword| transcript.contains(keyword))
}
