use axum::extract::Request;

/// Static asset paths that never count against a page quota.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &[
    "/_next/static",
    "/_next/image",
    "/image",
    "/sitemap.xml",
    "/favicon.ico",
    "/robots.txt",
];

/// Decides whether a request goes through the limiter at all.
#[derive(Debug, Clone, Default)]
pub struct RequestMatcher {
    excluded_prefixes: Vec<String>,
    skip_prefetch: bool,
}

impl RequestMatcher {
    /// Matches every request.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(excluded_prefixes: Vec<String>) -> Self {
        Self {
            excluded_prefixes,
            skip_prefetch: true,
        }
    }

    pub fn skip_prefetch(mut self, skip: bool) -> Self {
        self.skip_prefetch = skip;
        self
    }

    pub fn matches(&self, req: &Request) -> bool {
        let path = req.uri().path();
        if self
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return false;
        }
        !(self.skip_prefetch && is_prefetch(req))
    }
}

fn is_prefetch(req: &Request) -> bool {
    let headers = req.headers();
    headers.contains_key("next-router-prefetch")
        || headers
            .get("purpose")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("prefetch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(path: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn defaults() -> RequestMatcher {
        RequestMatcher::new(
            DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        )
    }

    #[test]
    fn static_assets_are_excluded() {
        let matcher = defaults();
        assert!(!matcher.matches(&request("/_next/static/chunks/app.js", &[])));
        assert!(!matcher.matches(&request("/favicon.ico", &[])));
        assert!(!matcher.matches(&request("/robots.txt", &[])));
        assert!(matcher.matches(&request("/dashboard", &[])));
        assert!(matcher.matches(&request("/", &[])));
    }

    #[test]
    fn prefetches_are_skipped() {
        let matcher = defaults();
        assert!(!matcher.matches(&request("/dashboard", &[("next-router-prefetch", "1")])));
        assert!(!matcher.matches(&request("/dashboard", &[("purpose", "Prefetch")])));
        assert!(matcher.matches(&request("/dashboard", &[("purpose", "navigate")])));

        let counting = defaults().skip_prefetch(false);
        assert!(counting.matches(&request("/dashboard", &[("purpose", "prefetch")])));
    }

    #[test]
    fn all_matches_everything() {
        let matcher = RequestMatcher::all();
        assert!(matcher.matches(&request("/favicon.ico", &[("purpose", "prefetch")])));
    }
}
