use crate::UrlError;
use url::Url;

/// Query parameters that never change what a storefront page shows
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "ref", "l"];

/// Parses and normalizes a URL string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Require a host (lowercased by the parser)
/// 4. Apply [`normalize_parsed`]
///
/// # Examples
///
/// ```
/// use storefront_crawler::url::normalize_url;
///
/// let url = normalize_url("https://cafebazaar.ir//cat//action/#top").unwrap();
/// assert_eq!(url.as_str(), "https://cafebazaar.ir/cat/action");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(normalize_parsed(url))
}

/// Normalizes an already-resolved absolute URL
///
/// - Removes the fragment
/// - Collapses repeated path separators
/// - Removes a trailing slash (except for the root path)
/// - Drops tracking query parameters, keeping the rest in their original order
pub fn normalize_parsed(mut url: Url) -> Url {
    url.set_fragment(None);

    let path = collapse_path(url.path());
    url.set_path(&path);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    url
}

/// Collapses `//` runs and strips the trailing slash from a path
fn collapse_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
