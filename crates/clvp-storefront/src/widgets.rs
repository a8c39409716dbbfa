//! Peripheral widgets that follow the picker through events: price,
//! inventory, badges and the add-to-cart button.
//!
//! Widgets only react to events raised in their own scope, so a product
//! card's swatch never disables the main add-to-cart button.

use clvp_core::{Element, Envelope, EventKind, InstanceId, Morph, PickerEvent, Scope};

use crate::context::StoreContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Price,
    Inventory,
    Badges,
    AddToCart,
}

impl WidgetKind {
    #[must_use]
    pub fn from_attr(raw: &str) -> Option<Self> {
        match raw.trim() {
            "price" => Some(WidgetKind::Price),
            "inventory" => Some(WidgetKind::Inventory),
            "badges" => Some(WidgetKind::Badges),
            "add-to-cart" => Some(WidgetKind::AddToCart),
            _ => None,
        }
    }

    /// Events the widget subscribes to.
    #[must_use]
    pub fn listens_to(self) -> &'static [EventKind] {
        match self {
            WidgetKind::AddToCart => &[EventKind::Selected, EventKind::Updated],
            WidgetKind::Price | WidgetKind::Inventory | WidgetKind::Badges => &[EventKind::Updated],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub id: InstanceId,
    pub kind: WidgetKind,
    pub scope: Scope,
}

impl Widget {
    /// Applies `envelope` to the widget's element in `live`. Returns `true`
    /// when the element changed.
    pub fn on_event(
        &self,
        live: &mut Element,
        envelope: &Envelope,
        context: &StoreContext,
        morph: &dyn Morph,
    ) -> bool {
        if envelope.scope != self.scope {
            return false;
        }
        let Some(element) = live.find_by_id_mut(self.id.as_str()) else {
            tracing::debug!(widget = %self.id, "widget element no longer on the page");
            return false;
        };

        match &envelope.event {
            PickerEvent::Selected(_) => match self.kind {
                WidgetKind::AddToCart => element.toggle_attr("disabled", true),
                _ => false,
            },
            PickerEvent::Updated(detail) => {
                // Fragments rendered by the server win over local derivation.
                let mut changed = detail
                    .data
                    .html
                    .find_by_id(self.id.as_str())
                    .is_some_and(|fresh| !morph.morph(element, fresh).is_noop());
                let variant = &detail.resource;
                changed |= match self.kind {
                    WidgetKind::Price => {
                        let price = variant.price.map(|p| p.to_string()).unwrap_or_default();
                        element.set_attr("data-price", &price)
                    }
                    WidgetKind::Inventory => {
                        let (quantity, in_stock) = match context.inventory(&variant.id) {
                            Some(inventory) => (Some(inventory.quantity), inventory.in_stock()),
                            None => (variant.inventory_quantity, variant.available),
                        };
                        let quantity_changed = match quantity {
                            Some(q) => element.set_attr("data-inventory-quantity", &q.to_string()),
                            None => element.remove_attr("data-inventory-quantity"),
                        };
                        element.set_attr("data-in-stock", bool_attr(in_stock)) | quantity_changed
                    }
                    WidgetKind::Badges => {
                        element.toggle_attr("data-on-sale", variant.on_sale())
                            | element.toggle_attr("data-sold-out", !variant.available)
                    }
                    WidgetKind::AddToCart => {
                        element.set_attr("data-variant-id", &variant.id)
                            | element.toggle_attr("disabled", !variant.available)
                    }
                };
                changed
            }
        }
    }

    /// Undoes what `Selected` did, after a navigation that never landed.
    /// `available` is the availability of the combination still on screen.
    pub fn release(&self, live: &mut Element, available: bool) -> bool {
        if self.kind != WidgetKind::AddToCart {
            return false;
        }
        live.find_by_id_mut(self.id.as_str())
            .is_some_and(|element| element.toggle_attr("disabled", !available))
    }
}

fn bool_attr(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clvp_core::events::{SelectedDetail, UpdatedData, UpdatedDetail};
    use clvp_core::html::parse_html;
    use clvp_core::{ReconcilingMorph, SelectedVariant};
    use url::Url;

    use super::*;
    use crate::context::{Inventory, InventoryPolicy};

    fn live() -> Element {
        parse_html(
            r#"<html><body>
              <div id="price" data-widget="price">$10</div>
              <div id="stock" data-widget="inventory"></div>
              <div id="badges" data-widget="badges"></div>
              <button id="atc" data-widget="add-to-cart">Add</button>
            </body></html>"#,
        )
        .unwrap()
    }

    fn context() -> StoreContext {
        StoreContext::new(&Url::parse("https://shop.test/").unwrap())
    }

    fn widget(id: &str, kind: WidgetKind) -> Widget {
        Widget {
            id: InstanceId::new(id),
            kind,
            scope: Scope::Page,
        }
    }

    fn updated(variant_json: &str, html: Element, scope: Scope) -> Envelope {
        Envelope {
            origin: InstanceId::new("main-picker"),
            scope,
            event: PickerEvent::Updated(UpdatedDetail {
                resource: SelectedVariant::from_json(variant_json).unwrap(),
                source_id: "opt".to_owned(),
                data: UpdatedData {
                    html: Arc::new(html),
                    product_id: "P2".to_owned(),
                    new_product: None,
                },
            }),
        }
    }

    fn selected(scope: Scope) -> Envelope {
        Envelope {
            origin: InstanceId::new("main-picker"),
            scope,
            event: PickerEvent::Selected(SelectedDetail { id: "2".to_owned() }),
        }
    }

    #[test]
    fn kinds_parse_from_attribute() {
        assert_eq!(WidgetKind::from_attr("add-to-cart"), Some(WidgetKind::AddToCart));
        assert_eq!(WidgetKind::from_attr("carousel"), None);
    }

    #[test]
    fn add_to_cart_disables_on_selected_and_follows_availability_on_updated() {
        let mut page = live();
        let atc = widget("atc", WidgetKind::AddToCart);
        assert!(atc.on_event(&mut page, &selected(Scope::Page), &context(), &ReconcilingMorph));
        assert!(page.find_by_id("atc").unwrap().has_attr("disabled"));

        let doc = parse_html("<html><body></body></html>").unwrap();
        let event = updated(r#"{"id": 2, "available": true}"#, doc, Scope::Page);
        assert!(atc.on_event(&mut page, &event, &context(), &ReconcilingMorph));
        let button = page.find_by_id("atc").unwrap();
        assert!(!button.has_attr("disabled"));
        assert_eq!(button.attr("data-variant-id"), Some("2"));
    }

    #[test]
    fn release_re_enables_add_to_cart_for_available_combination() {
        let mut page = live();
        let atc = widget("atc", WidgetKind::AddToCart);
        atc.on_event(&mut page, &selected(Scope::Page), &context(), &ReconcilingMorph);
        assert!(atc.release(&mut page, true));
        assert!(!page.find_by_id("atc").unwrap().has_attr("disabled"));
        assert!(!widget("price", WidgetKind::Price).release(&mut page, true));
    }

    #[test]
    fn events_from_other_scopes_are_ignored() {
        let mut page = live();
        let atc = widget("atc", WidgetKind::AddToCart);
        let card = Scope::Card("card-1".into());
        assert!(!atc.on_event(&mut page, &selected(card), &context(), &ReconcilingMorph));
        assert!(!page.find_by_id("atc").unwrap().has_attr("disabled"));
    }

    #[test]
    fn price_morphs_from_fetched_fragment() {
        let mut page = live();
        let doc = parse_html(r#"<html><body><div id="price" data-widget="price">$15</div></body></html>"#)
            .unwrap();
        let event = updated(r#"{"id": 2, "price": 1500}"#, doc, Scope::Page);
        assert!(widget("price", WidgetKind::Price).on_event(&mut page, &event, &context(), &ReconcilingMorph));
        let price = page.find_by_id("price").unwrap();
        assert_eq!(price.text_content(), "$15");
        assert_eq!(price.attr("data-price"), Some("1500"));
    }

    #[test]
    fn inventory_prefers_store_context() {
        let mut page = live();
        let ctx = context().with_inventory(
            "2",
            Inventory {
                quantity: 0,
                policy: InventoryPolicy::Continue,
            },
        );
        let doc = parse_html("<html><body></body></html>").unwrap();
        let event = updated(r#"{"id": 2, "available": false, "inventory_quantity": 9}"#, doc, Scope::Page);
        widget("stock", WidgetKind::Inventory).on_event(&mut page, &event, &ctx, &ReconcilingMorph);
        let stock = page.find_by_id("stock").unwrap();
        assert_eq!(stock.attr("data-inventory-quantity"), Some("0"));
        assert_eq!(stock.attr("data-in-stock"), Some("true"));
    }

    #[test]
    fn badges_mark_sale_and_sold_out() {
        let mut page = live();
        let doc = parse_html("<html><body></body></html>").unwrap();
        let event = updated(
            r#"{"id": 2, "price": 1000, "compare_at_price": 1500, "available": false}"#,
            doc,
            Scope::Page,
        );
        widget("badges", WidgetKind::Badges).on_event(&mut page, &event, &context(), &ReconcilingMorph);
        let badges = page.find_by_id("badges").unwrap();
        assert!(badges.has_attr("data-on-sale"));
        assert!(badges.has_attr("data-sold-out"));
    }
}
