//! URL state and browser history.
//!
//! The `variant` query parameter and the pathname are the only selection
//! state that survives a reload. They are derived from the URL, never stored
//! alongside it.

use url::Url;

pub const VARIANT_PARAM: &str = "variant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlState {
    pub pathname: String,
    /// Decimal variant id; non-numeric values are ignored.
    pub variant: Option<String>,
}

impl UrlState {
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        Self {
            pathname: url.path().to_owned(),
            variant: variant_param(url),
        }
    }
}

/// The numeric `variant` parameter of `url`, if any.
#[must_use]
pub fn variant_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == VARIANT_PARAM)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
}

/// `url` with its `variant` parameter replaced by `variant_id`, keeping every
/// other parameter in place.
#[must_use]
pub fn with_variant(url: &Url, variant_id: &str) -> Url {
    with_params(url, &[(VARIANT_PARAM, variant_id)])
}

/// `url` with each `(key, value)` in `params` replacing any existing
/// parameter of that key. Other parameters keep their order.
#[must_use]
pub fn with_params(url: &Url, params: &[(&str, &str)]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(k, _)| key == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut out = url.clone();
    out.set_query(None);
    {
        let mut pairs = out.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    out
}

/// Whether `a` and `b` point at the same product page and variant. Fragments
/// and unrelated parameters are ignored.
#[must_use]
pub fn same_location(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin() && UrlState::from_url(a) == UrlState::from_url(b)
}

/// How a URL change is written to history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// New entry; used when the product changed so back returns to it.
    Push,
    /// Overwrite the current entry; used for variant-only changes.
    Replace,
}

/// The browser history seam.
pub trait History: Send {
    fn location(&self) -> &Url;
    fn push(&mut self, url: Url);
    fn replace(&mut self, url: Url);
    /// Moves back one entry; `None` at the start of history.
    fn back(&mut self) -> Option<&Url>;
    /// Moves forward one entry; `None` at the end of history.
    fn forward(&mut self) -> Option<&Url>;
}

/// Writes `target` to `history` unless it is already the current location.
/// Returns `true` when history changed.
pub fn commit(history: &mut dyn History, target: &Url, mode: HistoryMode) -> bool {
    if history.location() == target {
        return false;
    }
    tracing::debug!(url = %target, ?mode, "committing url");
    match mode {
        HistoryMode::Push => history.push(target.clone()),
        HistoryMode::Replace => history.replace(target.clone()),
    }
    true
}

/// In-memory session history with browser semantics: pushing drops forward
/// entries.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Url>,
    index: usize,
}

impl MemoryHistory {
    #[must_use]
    pub fn new(initial: Url) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl History for MemoryHistory {
    fn location(&self) -> &Url {
        &self.entries[self.index]
    }

    fn push(&mut self, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, url: Url) {
        self.entries[self.index] = url;
    }

    fn back(&mut self) -> Option<&Url> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index])
    }

    fn forward(&mut self) -> Option<&Url> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index])
    }
}

#[cfg(test)]
#[path = "url_state_test.rs"]
mod tests;
