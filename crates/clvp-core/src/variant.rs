//! Typed view of the selected-variant JSON embedded in product pages.
//!
//! Only the fields widgets read are typed; anything else the theme renders
//! is carried through untouched in `extra` so downstream consumers still see
//! the full payload.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedVariant {
    /// Shopify variant id. Rendered as a JSON number; normalised to a string
    /// so it compares directly with combination ids and the URL parameter.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Defaults to `true` when absent (optimistic, as storefront JSON omits it
    /// on some themes).
    #[serde(default = "default_available")]
    pub available: bool,

    /// Price in minor units (cents).
    #[serde(default)]
    pub price: Option<i64>,

    #[serde(default)]
    pub compare_at_price: Option<i64>,

    #[serde(default)]
    pub inventory_quantity: Option<i64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SelectedVariant {
    /// Parses the embedded script body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not a variant object.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }

    #[must_use]
    pub fn on_sale(&self) -> bool {
        matches!((self.price, self.compare_at_price), (Some(p), Some(c)) if c > p)
    }
}

fn default_available() -> bool {
    true
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
        other => Err(serde::de::Error::custom(format!(
            "variant id must be a number or non-empty string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_id_and_keeps_unknown_fields() {
        let v = SelectedVariant::from_json(
            r#"{"id": 4242, "title": "Red / S", "available": false, "price": 1200,
                "compare_at_price": 1500, "sku": "R-S"}"#,
        )
        .unwrap();
        assert_eq!(v.id, "4242");
        assert!(!v.available);
        assert!(v.on_sale());
        assert_eq!(v.extra.get("sku").and_then(|s| s.as_str()), Some("R-S"));
    }

    #[test]
    fn missing_available_defaults_to_true() {
        let v = SelectedVariant::from_json(r#"{"id": "17"}"#).unwrap();
        assert_eq!(v.id, "17");
        assert!(v.available);
        assert!(!v.on_sale());
    }

    #[test]
    fn rejects_missing_id() {
        assert!(SelectedVariant::from_json(r#"{"title": "x"}"#).is_err());
        assert!(SelectedVariant::from_json(r#"{"id": null}"#).is_err());
    }
}
