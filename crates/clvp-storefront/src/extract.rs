//! Locating the anchors of a fetched product page.

use std::sync::Arc;

use clvp_core::anchors::{COMBINATIONS_ATTR, PRODUCT_ID_ATTR, SELECTED_VARIANT_ATTR};
use clvp_core::combination::Separators;
use clvp_core::html::parse_html;
use clvp_core::{CombinationSet, DomError, Element, SelectedVariant};
use url::Url;

use crate::error::StorefrontError;

/// A fetched page, parsed, with the anchors a navigation needs already
/// located inside the region that will be morphed.
#[derive(Debug, Clone)]
pub struct ProductDocument {
    pub url: Url,
    /// The whole parsed document, handed to `Updated` listeners.
    pub html: Arc<Element>,
    pub combinations: CombinationSet,
    pub variant: SelectedVariant,
    /// Product id rendered in the region, or the current combination's.
    pub product_id: Option<String>,
}

impl ProductDocument {
    /// Parses `body` and extracts the variant JSON and combinations payload
    /// from the element with id `region`.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::Dom`] when the region, the variant script or the
    ///   combinations payload is missing.
    /// - [`StorefrontError::Deserialize`] when the variant script is not a
    ///   variant object.
    pub fn parse(
        url: Url,
        body: &str,
        region: &str,
        separators: &Separators,
    ) -> Result<Self, StorefrontError> {
        let html = parse_html(body)?;
        let root = html
            .find_by_id(region)
            .ok_or_else(|| missing(format!("#{region}"), "fetched document"))?;

        let script = root
            .find_by_attr(SELECTED_VARIANT_ATTR)
            .ok_or_else(|| missing(format!("[{SELECTED_VARIANT_ATTR}]"), "fetched region"))?;
        let variant = SelectedVariant::from_json(&script.text_content()).map_err(|source| {
            StorefrontError::Deserialize {
                context: format!("selected variant in {url}"),
                source,
            }
        })?;

        let raw = root
            .find_by_attr(COMBINATIONS_ATTR)
            .and_then(|el| el.attr(COMBINATIONS_ATTR))
            .ok_or_else(|| missing(format!("[{COMBINATIONS_ATTR}]"), "fetched region"))?;
        let combinations = CombinationSet::parse_with(raw, separators);

        let product_id = root
            .find_by_attr(PRODUCT_ID_ATTR)
            .and_then(|el| el.attr(PRODUCT_ID_ATTR))
            .map(str::to_owned)
            .or_else(|| combinations.current().map(|c| c.product_id.clone()));

        Ok(Self {
            url,
            html: Arc::new(html),
            combinations,
            variant,
            product_id,
        })
    }

    #[must_use]
    pub fn fragment(&self, id: &str) -> Option<&Element> {
        self.html.find_by_id(id)
    }
}

fn missing(anchor: String, context: &'static str) -> StorefrontError {
    DomError::MissingAnchor { anchor, context }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><main id="MainContent" data-product-id="P2">
        <variant-picker id="main-picker" data-combinations="P1|V1|Red|S|/p1|true|false:::P2|V2|Blue|S|/p2|true|true">
          <script type="application/json" data-selected-variant>{"id": 2, "price": 1500}</script>
        </variant-picker>
      </main></body></html>"#;

    fn url() -> Url {
        Url::parse("https://shop.test/p2?variant=2").unwrap()
    }

    #[test]
    fn extracts_variant_combinations_and_product() {
        let doc = ProductDocument::parse(url(), PAGE, "MainContent", &Separators::default()).unwrap();
        assert_eq!(doc.variant.id, "2");
        assert_eq!(doc.variant.price, Some(1500));
        assert_eq!(doc.combinations.len(), 2);
        assert_eq!(doc.product_id.as_deref(), Some("P2"));
        assert!(doc.fragment("main-picker").is_some());
    }

    #[test]
    fn product_id_falls_back_to_current_combination() {
        let doc = ProductDocument::parse(url(), PAGE, "main-picker", &Separators::default()).unwrap();
        assert_eq!(doc.product_id.as_deref(), Some("P2"));
    }

    #[test]
    fn missing_region_is_an_anchor_error() {
        let err = ProductDocument::parse(url(), PAGE, "card-9", &Separators::default()).unwrap_err();
        assert!(err.is_missing_anchor(), "got {err:?}");
    }

    #[test]
    fn missing_variant_script_is_an_anchor_error() {
        let body = r#"<html><body><div id="MainContent" data-combinations=""></div></body></html>"#;
        let err = ProductDocument::parse(url(), body, "MainContent", &Separators::default()).unwrap_err();
        assert!(err.is_missing_anchor(), "got {err:?}");
    }

    #[test]
    fn malformed_variant_json_is_a_deserialize_error() {
        let body = r#"<html><body><div id="MainContent" data-combinations="">
            <script type="application/json" data-selected-variant>{"title": "no id"}</script>
        </div></body></html>"#;
        let err = ProductDocument::parse(url(), body, "MainContent", &Separators::default()).unwrap_err();
        assert!(matches!(err, StorefrontError::Deserialize { .. }), "got {err:?}");
    }
}
