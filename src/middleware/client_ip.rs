use http::HeaderMap;

/// Bucket shared by every request that carries no usable address.
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const CF_CONNECTING_IP: &str = "cf-connecting-ip";

/// Best-effort client address from proxy headers.
///
/// Checks `X-Forwarded-For` (first hop), then `X-Real-IP`, then
/// `CF-Connecting-IP`. A forwarded-for list whose first hop is blank maps to
/// [`UNKNOWN_CLIENT`] rather than falling through to the other headers.
/// A whitespace-only `X-Real-IP` is skipped in favour of `CF-Connecting-IP`,
/// so no request is ever keyed by an empty string.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_value(headers, FORWARDED_FOR) {
        let first = forwarded.split(',').next().map(str::trim).unwrap_or("");
        return if first.is_empty() {
            UNKNOWN_CLIENT.to_string()
        } else {
            first.to_string()
        };
    }

    [REAL_IP, CF_CONNECTING_IP]
        .into_iter()
        .filter_map(|name| header_value(headers, name))
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
