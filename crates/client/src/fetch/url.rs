//! URL canonicalization and link resolution.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a site URL given on the command line or in configuration.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to http:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed
        .host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| UrlError::InvalidUrl(format!("no host in {trimmed}")))?;
    parsed
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Host name without a leading `www.`.
pub fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Where a link found in content points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Absolute http(s) link with its lowercased host and encoded path.
    Absolute { url: Url, host: String, path: String },
    /// Link without a host; the path is resolved against the site.
    Relative { path: String },
    /// Anything that cannot be checked over HTTP (mailto:, anchors, ...).
    Unsupported,
}

/// Classify a raw link and normalize its path.
///
/// Paths come back percent-encoded the way the `url` crate serializes them,
/// so `/a b.gif` and `/a%20b.gif` resolve to the same path. Query strings and
/// fragments are dropped.
pub fn resolve_link(site: &Url, link: &str) -> LinkTarget {
    let link = link.trim();
    if link.is_empty() || link.starts_with('#') {
        return LinkTarget::Unsupported;
    }

    match Url::parse(link) {
        Ok(url) => match (url.scheme(), url.host_str()) {
            ("http" | "https", Some(host)) => {
                let host = host.to_lowercase();
                let path = url.path().to_string();
                LinkTarget::Absolute { url, host, path }
            }
            _ => LinkTarget::Unsupported,
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => match site.join(link) {
            Ok(resolved) if link.starts_with("//") => resolve_link(site, resolved.as_str()),
            Ok(resolved) => LinkTarget::Relative { path: resolved.path().to_string() },
            Err(_) => LinkTarget::Unsupported,
        },
        Err(_) => LinkTarget::Unsupported,
    }
}
