// codcall/src/rules/cod.rs

use crate::model::DEFAULT_COD_LABEL;

/// Gateway fragments that always mean cash on delivery, whatever the store
/// configured.
pub const COD_SYNONYMS: [&str; 3] = ["cod", "contra reembolso", "cash on delivery"];

/// True if any payment label contains, case-insensitively, the configured COD
/// label or one of [`COD_SYNONYMS`]. A blank configured label falls back to
/// [`DEFAULT_COD_LABEL`].
pub fn is_cod<S: AsRef<str>>(payment_labels: &[S], configured_label: &str) -> bool {
  let configured = match configured_label.trim() {
    "" => DEFAULT_COD_LABEL.to_lowercase(),
    label => label.to_lowercase(),
  };

  payment_labels.iter().any(|label| {
    let label = label.as_ref().to_lowercase();
    label.contains(&configured) || COD_SYNONYMS.iter().any(|token| label.contains(token))
  })
}
