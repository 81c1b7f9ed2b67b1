//! Cookie persistence across requests.

use std::collections::HashSet;
use std::fmt;

use cookie::Cookie;
use http::HeaderMap;
use http::header::SET_COOKIE;
use url::Url;

use crate::raw::{RawRequest, RawResponse};
use crate::{Error, Result};

/// Store of cookies keyed by host and path.
///
/// A client with a jar attached reads it before composing the cookies of
/// each request and writes the cookies of each response into it.
pub trait CookieJar: Send + Sync + fmt::Debug {
    /// Cookies that apply to `url`.
    fn cookies_for(&self, url: &Url) -> Vec<Cookie<'static>>;

    /// Remember cookies received from `url`.
    fn store(&self, url: &Url, cookies: &[Cookie<'static>]);

    /// Forget every cookie.
    fn clear(&self);

    /// Copy the cookies matching the request URL into the request.
    ///
    /// When several cookies share a name, the first one returned by
    /// [`CookieJar::cookies_for`] is kept.
    fn dump_cookies_to_request(&self, request: &mut RawRequest) {
        let Some(url) = request.url().cloned() else {
            return;
        };
        let mut written = HashSet::new();
        for cookie in self.cookies_for(&url) {
            if written.insert(cookie.name().to_string()) {
                request.set_cookie(cookie.name(), cookie.value());
            }
        }
    }

    /// Parse the `Set-Cookie` headers of a response and store them.
    ///
    /// Nothing is stored unless every header parses.
    fn parse_cookies_from_response(
        &self,
        url: &Url,
        response: &RawResponse,
    ) -> Result<Vec<Cookie<'static>>> {
        let cookies = parse_set_cookies(response.headers())?;
        self.store(url, &cookies);
        Ok(cookies)
    }
}

/// Parse every `Set-Cookie` header, failing on the first invalid one.
pub fn parse_set_cookies(headers: &HeaderMap) -> Result<Vec<Cookie<'static>>> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            Cookie::parse(value.clone()).map_err(|source| Error::CookieParse { value, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert2::let_assert;
    use http::HeaderValue;

    use super::*;

    #[test]
    fn parses_all_set_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("session=abc; Path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark"));

        let cookies = parse_set_cookies(&headers).expect("cookies");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name(), "session");
        assert_eq!(cookies[0].path(), Some("/"));
        assert_eq!(cookies[1].value(), "dark");
    }

    #[test]
    fn first_invalid_cookie_fails_the_batch() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("ok=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("=no-name"));

        let_assert!(Err(Error::CookieParse { value, .. }) = parse_set_cookies(&headers));
        assert_eq!(value, "=no-name");
    }
}
