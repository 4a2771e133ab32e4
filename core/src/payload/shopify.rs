// codcall/src/payload/shopify.rs

//! The subset of a Shopify order object the ingestor reads, plus the
//! normalisation rules that turn it into display fields.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const NO_NAME_PLACEHOLDER: &str = "Sin nombre";
pub const NO_PRODUCT_PLACEHOLDER: &str = "Producto no especificado";
pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
  #[serde(default)]
  pub id: Option<i64>,
  /// Display name such as `#1001`.
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub order_number: Option<i64>,
  #[serde(default)]
  pub payment_gateway_names: Vec<String>,
  #[serde(default)]
  pub shipping_address: Option<RawAddress>,
  #[serde(default)]
  pub billing_address: Option<RawAddress>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub customer: Option<RawCustomer>,
  #[serde(default)]
  pub line_items: Vec<RawLineItem>,
  /// Shopify sends money as a decimal string; numbers are accepted too.
  #[serde(default)]
  pub total_price: Option<JsonValue>,
  #[serde(default)]
  pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAddress {
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name: Option<String>,
  #[serde(default)]
  pub address1: Option<String>,
  #[serde(default)]
  pub address2: Option<String>,
  #[serde(default)]
  pub city: Option<String>,
  #[serde(default)]
  pub province: Option<String>,
  #[serde(default)]
  pub zip: Option<String>,
  #[serde(default)]
  pub country: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCustomer {
  #[serde(default)]
  pub first_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLineItem {
  #[serde(default)]
  pub title: String,
  #[serde(default = "one")]
  pub quantity: i64,
}

fn one() -> i64 {
  1
}

fn filled(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|v| !v.is_empty())
}

impl RawOrder {
  /// Shipping address, or the billing address when the order ships nowhere.
  pub fn delivery_address(&self) -> Option<&RawAddress> {
    self.shipping_address.as_ref().or(self.billing_address.as_ref())
  }

  pub fn order_number_display(&self) -> String {
    match (filled(&self.name), self.order_number, self.id) {
      (Some(name), _, _) => name.to_string(),
      (None, Some(number), _) => format!("#{}", number),
      (None, None, Some(id)) => format!("#{}", id),
      (None, None, None) => String::new(),
    }
  }

  /// Non-empty address parts joined with `, `.
  pub fn display_address(&self) -> String {
    let Some(addr) = self.delivery_address() else {
      return String::new();
    };
    [&addr.address1, &addr.address2, &addr.city, &addr.province, &addr.zip, &addr.country]
      .into_iter()
      .filter_map(filled)
      .collect::<Vec<_>>()
      .join(", ")
  }

  /// Delivery first + last name, then the customer's first name, then
  /// [`NO_NAME_PLACEHOLDER`].
  pub fn customer_name(&self) -> String {
    let from_address = self
      .delivery_address()
      .map(|addr| {
        format!(
          "{} {}",
          addr.first_name.as_deref().unwrap_or_default(),
          addr.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
      })
      .filter(|name| !name.is_empty());

    from_address
      .or_else(|| {
        self
          .customer
          .as_ref()
          .and_then(|c| filled(&c.first_name))
          .map(str::to_string)
      })
      .unwrap_or_else(|| NO_NAME_PLACEHOLDER.to_string())
  }

  /// Delivery phone, then order phone, then billing phone, else empty.
  pub fn customer_phone(&self) -> String {
    self
      .delivery_address()
      .and_then(|a| filled(&a.phone))
      .or_else(|| filled(&self.phone))
      .or_else(|| self.billing_address.as_ref().and_then(|a| filled(&a.phone)))
      .unwrap_or_default()
      .to_string()
  }

  /// `"{title}"` or `"{title} x{quantity}"`, joined with `, `.
  pub fn product_description(&self) -> String {
    if self.line_items.is_empty() {
      return NO_PRODUCT_PLACEHOLDER.to_string();
    }
    self
      .line_items
      .iter()
      .map(|item| {
        if item.quantity > 1 {
          format!("{} x{}", item.title, item.quantity)
        } else {
          item.title.clone()
        }
      })
      .collect::<Vec<_>>()
      .join(", ")
  }

  /// Unparsable or missing totals count as zero.
  pub fn amount(&self) -> f64 {
    match &self.total_price {
      Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
      Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
      _ => 0.0,
    }
  }

  pub fn currency_code(&self) -> String {
    filled(&self.currency).unwrap_or(DEFAULT_CURRENCY).to_string()
  }
}
