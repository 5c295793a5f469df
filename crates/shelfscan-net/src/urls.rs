use crate::error::{NetError, Result};
use url::Url;

/// Extract the host of a URL, lowercased.
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = parse(url)?;
    parsed
        .host_str()
        .ok_or_else(|| NetError::InvalidUrl(format!("no host in {url}")))
        .map(str::to_ascii_lowercase)
}

/// Split a URL into the domain and the path-with-query the robots rules are matched against.
pub fn request_target(url: &str) -> Result<(String, String)> {
    let parsed = parse(url)?;
    let domain = parsed
        .host_str()
        .ok_or_else(|| NetError::InvalidUrl(format!("no host in {url}")))?
        .to_ascii_lowercase();

    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Ok((domain, path))
}

/// Resolve `href` against `base`, leaving absolute links untouched.
#[must_use]
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .ok()
        .map(String::from)
}

fn parse(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NetError::InvalidUrl(format!(
            "unsupported scheme '{other}' in {url}"
        ))),
    }
}
