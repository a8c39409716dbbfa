//! Attribute and id names the server-rendered markup exposes.
//!
//! These are the only places where DOM attributes act as a schema. Everything
//! past the boundary (events, picker state) is typed.

/// Id of the main content region replaced when a navigation crosses product
/// boundaries.
pub const MAIN_CONTENT_ID: &str = "MainContent";

/// Tag of a picker host element.
pub const PICKER_TAG: &str = "variant-picker";
/// Tag of a product card; scopes the pickers and widgets inside it.
pub const PRODUCT_CARD_TAG: &str = "product-card";
/// Tag of the quick-add dialog; scopes the pickers and widgets inside it.
pub const QUICK_ADD_TAG: &str = "quick-add-dialog";

/// Attribute carrying the delimited combinations string.
pub const COMBINATIONS_ATTR: &str = "data-combinations";
/// Attribute selecting the picker strategy (`standalone`, `swatches`,
/// `combined-listing-dual`).
pub const PICKER_KIND_ATTR: &str = "data-picker-kind";
/// Attribute carrying the section id used for section rendering requests.
pub const SECTION_ID_ATTR: &str = "data-section-id";
/// Attribute carrying the product id of the product currently rendered.
pub const PRODUCT_ID_ATTR: &str = "data-product-id";

/// Marker attribute of the `<script type="application/json">` holding the
/// selected variant.
pub const SELECTED_VARIANT_ATTR: &str = "data-selected-variant";
/// Marker attribute of the `<script type="application/json">` holding the
/// store context (locale root, inventories).
pub const STORE_CONTEXT_ATTR: &str = "data-store-context";

/// Attribute naming a peripheral widget (`price`, `inventory`, `badges`,
/// `add-to-cart`).
pub const WIDGET_ATTR: &str = "data-widget";

/// Written on option inputs: `true` when an orderable combination exists for
/// the option given the other dimension's selection.
pub const OPTION_AVAILABLE_ATTR: &str = "data-option-available";
/// Written on picker hosts while a navigation is in flight.
pub const PENDING_ATTR: &str = "data-pending";
/// Pill animation continuity: previous and current option index per dimension.
pub const PREVIOUS_INDEX_ATTR_PREFIX: &str = "data-previous-index-";
pub const CURRENT_INDEX_ATTR_PREFIX: &str = "data-current-index-";
