//! Combination Model: the color × size matrix of a combined listing.
//!
//! The ERP behind the store allows a single variant per product, so every
//! color/size pair of a logical product is its own Shopify product. The
//! server renders the whole family into one delimited string on the picker
//! host:
//!
//! ```text
//! productId|variantId|color|size|productUrl|available|isCurrent:::productId|...
//! ```
//!
//! The data is rendered by trusted templates, so parsing degrades instead of
//! failing: a malformed entry is dropped and the rest of the string is kept.

use std::collections::HashSet;

use serde::Serialize;

/// Separator between entries (3 characters).
pub const ENTRY_SEPARATOR: &str = ":::";
/// Separator between the fields of one entry.
pub const FIELD_SEPARATOR: char = '|';

const FIELD_COUNT: usize = 7;

/// Entry and field separators of the combinations string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separators {
    pub entry: String,
    pub field: char,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            entry: ENTRY_SEPARATOR.to_owned(),
            field: FIELD_SEPARATOR,
        }
    }
}

/// One buyable unit of a combined listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combination {
    pub product_id: String,
    pub variant_id: String,
    pub color: String,
    pub size: String,
    /// Product page URL as rendered; usually root-relative (`/products/...`).
    pub product_url: String,
    pub available: bool,
    /// `true` for the product currently on screen.
    pub is_current: bool,
}

impl Combination {
    /// Case-insensitive, whitespace-trimmed match on both dimensions.
    #[must_use]
    pub fn matches(&self, color: &str, size: &str) -> bool {
        same_value(&self.color, color) && same_value(&self.size, size)
    }

    fn key(&self) -> (String, String) {
        (normalize_value(&self.color), normalize_value(&self.size))
    }

    fn parse_entry(entry: &str, field_separator: char) -> Option<Self> {
        let fields: Vec<&str> = entry.split(field_separator).map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            return None;
        }
        let product_id = fields[0];
        let variant_id = fields[1];
        if product_id.is_empty() || variant_id.is_empty() {
            return None;
        }
        Some(Self {
            product_id: product_id.to_owned(),
            variant_id: variant_id.to_owned(),
            color: fields[2].to_owned(),
            size: fields[3].to_owned(),
            product_url: fields[4].to_owned(),
            available: parse_flag(fields[5])?,
            is_current: parse_flag(fields[6])?,
        })
    }

    fn write_entry(&self, field_separator: char, out: &mut String) {
        let fields = [
            self.product_id.as_str(),
            self.variant_id.as_str(),
            self.color.as_str(),
            self.size.as_str(),
            self.product_url.as_str(),
            bool_str(self.available),
            bool_str(self.is_current),
        ];
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(field_separator);
            }
            out.push_str(field);
        }
    }
}

/// Ordered combinations of one product family.
///
/// Invariants, enforced on construction:
/// - at most one entry has `is_current = true` (the first one wins);
/// - (color, size) pairs are unique, compared case-insensitively after
///   trimming (the first one in input order wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinationSet {
    entries: Vec<Combination>,
}

impl CombinationSet {
    /// Parses the delimited string. Never fails; malformed entries are dropped.
    #[must_use]
    pub fn parse(raw: &str, entry_separator: &str, field_separator: char) -> Self {
        if entry_separator.is_empty() {
            tracing::warn!("empty entry separator; treating combinations as empty");
            return Self::default();
        }
        let mut parsed = Vec::new();
        for (index, entry) in raw.split(entry_separator).enumerate() {
            if entry.trim().is_empty() {
                continue;
            }
            match Combination::parse_entry(entry, field_separator) {
                Some(combination) => parsed.push(combination),
                None => tracing::warn!(index, entry, "dropping malformed combination entry"),
            }
        }
        Self::from_entries(parsed)
    }

    /// Parses with configured separators.
    #[must_use]
    pub fn parse_with(raw: &str, separators: &Separators) -> Self {
        Self::parse(raw, &separators.entry, separators.field)
    }

    /// Parses with the default separators.
    #[must_use]
    pub fn parse_default(raw: &str) -> Self {
        Self::parse(raw, ENTRY_SEPARATOR, FIELD_SEPARATOR)
    }

    /// Builds a set from already-typed entries, enforcing the set invariants.
    #[must_use]
    pub fn from_entries(entries: Vec<Combination>) -> Self {
        let mut seen = HashSet::new();
        let mut has_current = false;
        let mut kept = Vec::with_capacity(entries.len());
        for mut combination in entries {
            if !seen.insert(combination.key()) {
                tracing::warn!(
                    variant_id = %combination.variant_id,
                    color = %combination.color,
                    size = %combination.size,
                    "duplicate color/size pair; keeping the first entry"
                );
                continue;
            }
            if combination.is_current {
                if has_current {
                    tracing::warn!(
                        variant_id = %combination.variant_id,
                        "more than one current combination; clearing the later flag"
                    );
                    combination.is_current = false;
                }
                has_current = true;
            }
            kept.push(combination);
        }
        Self { entries: kept }
    }

    #[must_use]
    pub fn serialize(&self, entry_separator: &str, field_separator: char) -> String {
        let mut out = String::new();
        for (i, combination) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str(entry_separator);
            }
            combination.write_entry(field_separator, &mut out);
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combination> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The combination currently on screen, if the server marked one.
    #[must_use]
    pub fn current(&self) -> Option<&Combination> {
        self.entries.iter().find(|c| c.is_current)
    }

    /// Colors having at least one combination at `for_size` (all colors when
    /// unconstrained). First-seen order, deduplicated.
    #[must_use]
    pub fn available_colors(&self, for_size: Option<&str>) -> Vec<String> {
        distinct(
            self.entries
                .iter()
                .filter(|c| for_size.map_or(true, |size| same_value(&c.size, size)))
                .map(|c| c.color.as_str()),
        )
    }

    /// Sizes having at least one combination in `for_color` (all sizes when
    /// unconstrained). First-seen order, deduplicated.
    #[must_use]
    pub fn available_sizes(&self, for_color: Option<&str>) -> Vec<String> {
        distinct(
            self.entries
                .iter()
                .filter(|c| for_color.map_or(true, |color| same_value(&c.color, color)))
                .map(|c| c.size.as_str()),
        )
    }

    #[must_use]
    pub fn find(&self, color: &str, size: &str) -> Option<&Combination> {
        self.entries.iter().find(|c| c.matches(color, size))
    }

    #[must_use]
    pub fn find_by_variant_id(&self, variant_id: &str) -> Option<&Combination> {
        let wanted = variant_id.trim();
        self.entries.iter().find(|c| c.variant_id == wanted)
    }

    /// First available combination of `color`, falling back to the first
    /// combination of `color` when none is available.
    #[must_use]
    pub fn first_for_color(&self, color: &str) -> Option<&Combination> {
        let mut of_color = self.entries.iter().filter(|c| same_value(&c.color, color));
        let first = of_color.clone().next();
        of_color.find(|c| c.available).or(first)
    }

    /// Whether an orderable combination exists for the given constraints.
    /// `None` leaves that dimension unconstrained.
    #[must_use]
    pub fn has_available(&self, color: Option<&str>, size: Option<&str>) -> bool {
        self.entries.iter().any(|c| {
            c.available
                && color.map_or(true, |v| same_value(&c.color, v))
                && size.map_or(true, |v| same_value(&c.size, v))
        })
    }

    /// Whether every entry belongs to one product (a plain, non-combined
    /// listing).
    #[must_use]
    pub fn is_single_product(&self) -> bool {
        let mut ids = self.entries.iter().map(|c| c.product_id.as_str());
        match ids.next() {
            Some(first) => ids.all(|id| id == first),
            None => true,
        }
    }
}

/// Canonical form used for option comparisons.
#[must_use]
pub fn normalize_value(value: &str) -> String {
    value.trim().to_lowercase()
}

#[must_use]
pub fn same_value(a: &str, b: &str) -> bool {
    normalize_value(a) == normalize_value(b)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(normalize_value(v)))
        .map(str::to_owned)
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn bool_str(flag: bool) -> &'static str {
    if flag {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
#[path = "combination_test.rs"]
mod tests;
