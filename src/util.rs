use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

static DISPOSITION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([\w.\-]+)""#).expect("disposition pattern is valid"));

pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().and_then(|s| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

/// Pulls the quoted filename out of a `Content-Disposition` header value.
pub(crate) fn filename_from_disposition(value: &str) -> Option<String> {
    DISPOSITION_NAME
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| name != "." && name != "..")
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Whether `target` is on the same scheme, host and port as `base`.
pub(crate) fn same_origin(base: &Url, target: &Url) -> bool {
    base.scheme() == target.scheme()
        && base.host_str() == target.host_str()
        && base.port_or_known_default() == target.port_or_known_default()
}
