use super::Store;
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use storefront_crawler::url::extract_domain;
///
/// let url = Url::parse("https://MYKET.IR/app/com.foo").unwrap();
/// assert_eq!(extract_domain(&url), Some("myket.ir".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a host matches a domain pattern
///
/// `"*.myket.ir"` matches `myket.ir` itself and any subdomain of it;
/// a pattern without the wildcard prefix only matches exactly.
pub fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || (host.len() > base.len()
                    && host.ends_with(base)
                    && host.as_bytes()[host.len() - base.len() - 1] == b'.')
        }
        None => host == pattern,
    }
}

/// Returns true when two URLs belong to the same site
///
/// Storefront URLs compare by store, so `www.myket.ir` and `myket.ir` are
/// one site. Any other URL must match the host exactly.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (Store::from_url(a), Store::from_url(b)) {
        (Some(x), Some(y)) => x == y,
        (None, None) => match (extract_domain(a), extract_domain(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => false,
    }
}
