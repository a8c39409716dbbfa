//! Store origin and product URL resolution.

use url::Url;

use crate::error::StorefrontError;

/// Hostname of `url`, for error messages.
pub(crate) fn extract_domain(url: &Url) -> String {
    url.host_str()
        .map_or_else(|| url.to_string(), str::to_owned)
}

/// Resolves a product URL from a combination against the store origin.
///
/// Relative paths are prefixed with the locale `root_path` (`/fr/`) unless
/// they already carry it. Absolute URLs must share the store's origin.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidUrl`] if the result is not a valid URL or
/// points at another host.
pub fn resolve_product_url(
    origin: &Url,
    root_path: &str,
    product_url: &str,
) -> Result<Url, StorefrontError> {
    let product_url = product_url.trim();
    let invalid = |reason: String| StorefrontError::InvalidUrl {
        url: product_url.to_owned(),
        reason,
    };
    if product_url.is_empty() {
        return Err(invalid("empty product URL".to_owned()));
    }

    let root = root_path.trim_end_matches('/');
    let joined = if product_url.starts_with('/')
        && !root.is_empty()
        && product_url != root
        && !product_url.starts_with(&format!("{root}/"))
    {
        format!("{root}{product_url}")
    } else {
        product_url.to_owned()
    };

    let resolved = origin.join(&joined).map_err(|e| invalid(e.to_string()))?;
    if resolved.origin() != origin.origin() {
        return Err(invalid(format!(
            "outside store origin {}",
            origin.origin().ascii_serialization()
        )));
    }
    Ok(resolved)
}
