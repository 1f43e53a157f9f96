//! URI canonicalization used for grouping and display.
//!
//! Two forms are derived from a stored URI:
//! - a **domain key** (`normalize_domain`) used only to group logins by site
//! - a **shortened URI** (`shorten_uri`) that replaces the stored value on
//!   canonical records
//!
//! Neither function fails. Input that cannot be split into URI parts falls
//! back to a best-effort literal.

/// Scheme assumed when a URI does not carry one.
const DEFAULT_SCHEME: &str = "https";

/// Length limit applied by [`shorten_uri`].
pub const DEFAULT_MAX_URI_LEN: usize = 128;

/// Ports that are implied by the scheme and dropped from the host.
const DEFAULT_PORTS: &[&str] = &["80", "443"];

/// The parts of a URI that survive canonicalization.
/// Query string and fragment are never kept.
#[derive(Debug)]
struct UriParts<'a> {
    scheme: String,
    host: String,
    path: &'a str,
}

/// Split a URI into scheme, normalized host and path.
///
/// Returns `None` when the network location has unbalanced IPv6 brackets,
/// which is the only input treated as unparsable.
fn split_uri(uri: &str) -> Option<UriParts<'_>> {
    let (scheme, rest) = match split_scheme(uri) {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
        None => (DEFAULT_SCHEME.to_string(), uri),
    };

    // Drop query and fragment
    let end = rest.find(|c: char| c == '?' || c == '#').unwrap_or(rest.len());
    let rest = &rest[..end];

    let (host, path) = match rest.strip_prefix("//") {
        Some(authority) => {
            let pos = authority.find('/').unwrap_or(authority.len());
            let netloc = &authority[..pos];
            if netloc.contains('[') != netloc.contains(']') {
                return None;
            }
            (netloc, &authority[pos..])
        }
        // No network location: the first path segment names the host
        None => {
            let pos = rest.find('/').unwrap_or(rest.len());
            (&rest[..pos], &rest[pos..])
        }
    };

    Some(UriParts {
        scheme,
        host: normalize_host(host),
        path: path.trim_end(),
    })
}

/// Split off a leading `scheme:` if one is present.
///
/// `example.com:8080/login` is a host with a port, not a scheme named
/// `example.com`, so a colon followed only by digits is not a scheme separator.
fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once(':')?;

    let mut chars = scheme.chars();
    let valid_start = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
    if !valid_start
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    {
        return None;
    }

    let port_end = rest
        .find(|c: char| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    let port = &rest[..port_end];
    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((scheme, rest))
}

/// Canonical host: lowercase, no leading `www.`, no default port.
///
/// Stripping repeats until nothing changes so the result is a fixed point,
/// which keeps `shorten_uri` idempotent.
fn normalize_host(netloc: &str) -> String {
    let mut host = netloc.trim().to_lowercase();
    loop {
        let mut next = host.as_str();
        if let Some(stripped) = next.strip_prefix("www.") {
            next = stripped;
        }
        if let Some((name, port)) = next.rsplit_once(':') {
            if DEFAULT_PORTS.contains(&port) {
                next = name;
            }
        }
        if next.len() == host.len() {
            return host;
        }
        host = next.to_string();
    }
}

/// Extract the grouping key for a URI.
///
/// Scheme, path, query and fragment are ignored. The host is lowercased with
/// a leading `www.` and an explicit `:80` / `:443` removed. URIs without a
/// network location (`example.com/login`) use their first path segment.
///
/// # Examples
/// ```
/// use vault_cleanup::normalize_domain;
///
/// assert_eq!(normalize_domain("https://WWW.Example.com:443/x"), "example.com");
/// assert_eq!(normalize_domain("example.com"), "example.com");
/// ```
pub fn normalize_domain(uri: &str) -> String {
    let trimmed = uri.trim();
    match split_uri(trimmed) {
        Some(parts) => parts.host,
        None => trimmed.to_lowercase(),
    }
}

/// Canonical display form of a URI, limited to [`DEFAULT_MAX_URI_LEN`] characters.
pub fn shorten_uri(uri: &str) -> String {
    shorten_uri_with_limit(uri, DEFAULT_MAX_URI_LEN)
}

/// Canonical display form of a URI.
///
/// * Always strips the query string and fragment.
/// * Rebuilds `scheme://host/path` with the normalized host (`https` when no scheme).
/// * If that still exceeds `max_len` characters, the path is dropped as well.
///
/// Applying the function to its own output returns the same string.
pub fn shorten_uri_with_limit(uri: &str, max_len: usize) -> String {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let parts = match split_uri(trimmed) {
        Some(parts) => parts,
        None => return trimmed.to_string(),
    };

    let candidate = format!("{}://{}{}", parts.scheme, parts.host, parts.path);
    if candidate.chars().count() > max_len {
        return format!("{}://{}", parts.scheme, parts.host);
    }

    candidate
}
