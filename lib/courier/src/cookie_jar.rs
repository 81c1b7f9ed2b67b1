//! In-memory cookie jar.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use cookie::Cookie;
use cookie::time::OffsetDateTime;
use courier_core::CookieJar;
use url::Url;

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    path: String,
    host_only: bool,
    secure: bool,
    expires_at: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Thread-safe cookie jar keeping cookies in memory, keyed by domain.
///
/// Domain and path matching follow RFC 6265: cookies without a `Domain`
/// attribute only go back to the exact host that set them, cookies without a
/// `Path` attribute get the directory of the request path, and `Secure`
/// cookies are only sent over https. A `Max-Age` of zero or less, or an
/// `Expires` date in the past, deletes the cookie.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    domains: RwLock<HashMap<String, Vec<StoredCookie>>>,
}

impl MemoryCookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cookies, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Returns `true` if the jar holds no cookie.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookies_for(&self, url: &Url) -> Vec<Cookie<'static>> {
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return Vec::new();
        };
        let secure = url.scheme() == "https";
        let now = OffsetDateTime::now_utc();

        let domains = self.domains.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<&StoredCookie> = domains
            .iter()
            .filter(|(domain, _)| domain.as_str() == host || domain_matches(&host, domain))
            .flat_map(|(domain, cookies)| {
                let exact = domain.as_str() == host;
                cookies.iter().filter(move |c| exact || !c.host_only)
            })
            .filter(|c| !c.is_expired(now))
            .filter(|c| secure || !c.secure)
            .filter(|c| path_matches(url.path(), &c.path))
            .collect();

        // Longer paths first.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
            .into_iter()
            .map(|c| Cookie::new(c.name.clone(), c.value.clone()))
            .collect()
    }

    fn store(&self, url: &Url, cookies: &[Cookie<'static>]) {
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return;
        };
        let now = OffsetDateTime::now_utc();
        let mut domains = self.domains.write().unwrap_or_else(PoisonError::into_inner);

        for cookie in cookies {
            let attribute = cookie
                .domain()
                .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty());
            let (domain, host_only) = match attribute {
                Some(domain) if domain == host || domain_matches(&host, &domain) => (domain, false),
                Some(domain) => {
                    tracing::debug!(target: "courier", %host, %domain, "cookie domain rejected");
                    continue;
                }
                None => (host.clone(), true),
            };
            let path = cookie
                .path()
                .filter(|p| p.starts_with('/'))
                .map_or_else(|| default_path(url.path()), str::to_string);

            // A Max-Age past the representable range never expires.
            let expires_at = match cookie.max_age() {
                Some(max_age) => now.checked_add(max_age),
                None => cookie.expires_datetime(),
            };

            let entries = domains.entry(domain).or_default();
            entries.retain(|c| !(c.name == cookie.name() && c.path == path));
            let stored = StoredCookie {
                name: cookie.name().to_string(),
                value: cookie.value().to_string(),
                path,
                host_only,
                secure: cookie.secure().unwrap_or(false),
                expires_at,
            };
            if !stored.is_expired(now) {
                entries.push(stored);
            }
        }
        domains.retain(|_, cookies| !cookies.is_empty());
    }

    fn clear(&self) {
        self.domains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// `host` is a subdomain of `domain`.
fn domain_matches(host: &str, domain: &str) -> bool {
    host.strip_suffix(domain)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Directory of the request path, `/` at the top.
fn default_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path.get(..i).unwrap_or("/").to_string(),
    }
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    let Some(rest) = request_path.strip_prefix(cookie_path) else {
        return false;
    };
    rest.is_empty() || cookie_path.ends_with('/') || rest.starts_with('/')
}

#[cfg(test)]
mod tests {
    use courier_core::RawRequest;

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    fn parse(s: &str) -> Cookie<'static> {
        Cookie::parse(s.to_string()).expect("cookie")
    }

    fn names(cookies: &[Cookie<'static>]) -> Vec<String> {
        cookies.iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn host_only_cookies_stay_on_their_host() {
        let jar = MemoryCookieJar::new();
        jar.store(&url("http://example.com/"), &[parse("a=1")]);

        assert_eq!(names(&jar.cookies_for(&url("http://example.com/x"))), ["a"]);
        assert!(jar.cookies_for(&url("http://api.example.com/")).is_empty());
    }

    #[test]
    fn domain_cookies_reach_subdomains() {
        let jar = MemoryCookieJar::new();
        jar.store(
            &url("http://www.example.com/"),
            &[parse("a=1; Domain=.example.com")],
        );

        assert_eq!(names(&jar.cookies_for(&url("http://api.example.com/"))), ["a"]);
        assert_eq!(names(&jar.cookies_for(&url("http://example.com/"))), ["a"]);
        assert!(jar.cookies_for(&url("http://badexample.com/")).is_empty());
    }

    #[test]
    fn foreign_domain_is_rejected() {
        let jar = MemoryCookieJar::new();
        jar.store(&url("http://example.com/"), &[parse("a=1; Domain=other.org")]);
        assert!(jar.is_empty());
    }

    #[test]
    fn default_path_is_request_directory() {
        let jar = MemoryCookieJar::new();
        jar.store(&url("http://example.com/docs/page"), &[parse("a=1")]);

        assert_eq!(names(&jar.cookies_for(&url("http://example.com/docs"))), ["a"]);
        assert_eq!(
            names(&jar.cookies_for(&url("http://example.com/docs/other"))),
            ["a"]
        );
        assert!(jar.cookies_for(&url("http://example.com/")).is_empty());
        assert!(jar.cookies_for(&url("http://example.com/docsx")).is_empty());
    }

    #[test]
    fn longer_paths_come_first() {
        let jar = MemoryCookieJar::new();
        jar.store(
            &url("http://example.com/"),
            &[parse("root=1; Path=/"), parse("api=2; Path=/api")],
        );
        assert_eq!(
            names(&jar.cookies_for(&url("http://example.com/api/v1"))),
            ["api", "root"]
        );
    }

    #[test]
    fn expired_cookies_are_removed() {
        let jar = MemoryCookieJar::new();
        let site = url("http://example.com/");
        jar.store(&site, &[parse("a=1"), parse("b=2")]);
        jar.store(
            &site,
            &[
                parse("a=gone; Max-Age=0"),
                parse("b=gone; Expires=Thu, 01 Jan 1970 00:00:00 GMT"),
            ],
        );

        assert!(jar.cookies_for(&site).is_empty());
        assert!(jar.is_empty());
    }

    #[test]
    fn huge_max_age_never_expires() {
        let jar = MemoryCookieJar::new();
        let site = url("http://example.com/");
        jar.store(&site, &[parse("a=1; Max-Age=99999999999999")]);

        assert_eq!(names(&jar.cookies_for(&site)), ["a"]);
    }

    #[test]
    fn most_specific_path_wins_for_same_name() {
        let jar = MemoryCookieJar::new();
        jar.store(
            &url("http://example.com/"),
            &[parse("a=root; Path=/"), parse("a=api; Path=/api")],
        );

        let mut request = RawRequest::new();
        request.set_url(url("http://example.com/api/v1"));
        jar.dump_cookies_to_request(&mut request);
        assert_eq!(
            request.cookies().collect::<Vec<_>>(),
            [("a", "api")]
        );
    }

    #[test]
    fn secure_cookies_need_https() {
        let jar = MemoryCookieJar::new();
        jar.store(&url("https://example.com/"), &[parse("a=1; Secure")]);

        assert!(jar.cookies_for(&url("http://example.com/")).is_empty());
        assert_eq!(names(&jar.cookies_for(&url("https://example.com/"))), ["a"]);
    }

    #[test]
    fn newer_value_replaces_older() {
        let jar = MemoryCookieJar::new();
        let site = url("http://example.com/");
        jar.store(&site, &[parse("a=1")]);
        jar.store(&site, &[parse("a=2")]);

        let cookies = jar.cookies_for(&site);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.first().map(Cookie::value), Some("2"));
    }

    #[test]
    fn clear_empties_the_jar() {
        let jar = MemoryCookieJar::new();
        jar.store(&url("http://example.com/"), &[parse("a=1")]);
        jar.clear();
        assert!(jar.is_empty());
    }
}
