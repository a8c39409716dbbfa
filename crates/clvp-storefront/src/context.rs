//! Storefront context: the store origin, the locale root path and the
//! per-variant inventory map.
//!
//! Themes render this as a JSON script on every page:
//!
//! ```html
//! <script type="application/json" data-store-context>
//!   {"root": "/fr/", "inventories": {"101": {"quantity": 3, "policy": "deny"}}}
//! </script>
//! ```
//!
//! The context is built once per session and handed to whatever needs it;
//! nothing reads it from a global.

use std::collections::HashMap;

use clvp_core::anchors::STORE_CONTEXT_ATTR;
use clvp_core::Element;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::resolve_product_url;
use crate::error::StorefrontError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryPolicy {
    /// Stop selling at zero.
    #[default]
    Deny,
    /// Keep selling past zero (backorders).
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub quantity: i64,
    #[serde(default)]
    pub policy: InventoryPolicy,
}

impl Inventory {
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.quantity > 0 || self.policy == InventoryPolicy::Continue
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawContext {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    inventories: HashMap<String, Inventory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreContext {
    origin: Url,
    root_path: String,
    inventories: HashMap<String, Inventory>,
}

impl StoreContext {
    /// Context for the store serving `page_url`, with the root locale and no
    /// inventory data.
    #[must_use]
    pub fn new(page_url: &Url) -> Self {
        let mut origin = page_url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        Self {
            origin,
            root_path: "/".to_owned(),
            inventories: HashMap::new(),
        }
    }

    /// Reads the context script from `document`. A missing script yields the
    /// defaults; a malformed one is logged and ignored.
    #[must_use]
    pub fn from_document(document: &Element, page_url: &Url) -> Self {
        let mut context = Self::new(page_url);
        if let Some(raw) = read_raw(document) {
            context.apply(raw);
        }
        context
    }

    #[must_use]
    pub fn with_root_path(mut self, root_path: &str) -> Self {
        self.root_path = normalize_root(root_path);
        self
    }

    #[must_use]
    pub fn with_inventory(mut self, variant_id: &str, inventory: Inventory) -> Self {
        self.inventories.insert(variant_id.to_owned(), inventory);
        self
    }

    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    #[must_use]
    pub fn inventory(&self, variant_id: &str) -> Option<&Inventory> {
        self.inventories.get(variant_id)
    }

    /// Merges the context script of a freshly fetched document: inventories
    /// are added or overwritten per variant, and the root path follows the
    /// document when it declares one.
    pub fn absorb(&mut self, document: &Element) {
        if let Some(raw) = read_raw(document) {
            self.apply(raw);
        }
    }

    /// Resolves a combination's product URL against this store.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidUrl`] for empty, malformed or
    /// foreign-origin URLs.
    pub fn resolve(&self, product_url: &str) -> Result<Url, StorefrontError> {
        resolve_product_url(&self.origin, &self.root_path, product_url)
    }

    fn apply(&mut self, raw: RawContext) {
        if let Some(root) = raw.root {
            self.root_path = normalize_root(&root);
        }
        self.inventories.extend(raw.inventories);
    }
}

fn read_raw(document: &Element) -> Option<RawContext> {
    let script = document.find_by_attr(STORE_CONTEXT_ATTR)?;
    match serde_json::from_str::<RawContext>(script.text_content().trim()) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed store context");
            None
        }
    }
}

fn normalize_root(root: &str) -> String {
    let trimmed = root.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}
