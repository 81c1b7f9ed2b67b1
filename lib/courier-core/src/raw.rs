//! Wire-level request and response.
//!
//! The pipeline stages write into a [`RawRequest`]; the transport turns it
//! into an `http::Request` and hands back a [`RawResponse`].

use std::fmt;

use bytes::Bytes;
use http::header::{COOKIE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};
use url::{Position, Url};

use crate::pool::Reset;
use crate::{Error, Method, Result};

/// The request as it goes on the wire.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    body: Bytes,
}

impl RawRequest {
    /// Create an empty GET request without URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Set the method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// The composed URL, once the URL stage ran.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Set the URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = Some(url);
    }

    /// The headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Replace every value of a header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Append a header value.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Remove every value of a header.
    pub fn del_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Cookies in the order they were first set.
    pub fn cookies(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of a cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a cookie, replacing a previous one with the same name.
    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
    }

    /// The encoded body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Set the encoded body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// The `Cookie` header value, if any cookie is set.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let joined = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }

    /// Build the `http::Request` handed to the transport.
    pub fn to_http(&self) -> Result<http::Request<Bytes>> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| Error::invalid_request("request URL is not set"))?;

        // The fragment never goes on the wire.
        let mut request = http::Request::builder()
            .method(http::Method::from(self.method))
            .uri(&url[..Position::AfterQuery])
            .body(self.body.clone())?;

        *request.headers_mut() = self.headers.clone();
        if let Some(cookies) = self.cookie_header() {
            let value = HeaderValue::from_str(&cookies)
                .map_err(|e| Error::invalid_header(format!("Cookie: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }
        Ok(request)
    }
}

impl Reset for RawRequest {
    fn reset(&mut self) {
        self.method = Method::default();
        self.url = None;
        self.headers.clear();
        self.cookies.clear();
        self.body = Bytes::new();
    }
}

impl fmt::Display for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.url.as_ref().map_or_else(
            || "/".to_string(),
            |url| match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            },
        );
        write!(f, "{} {target} HTTP/1.1\r\n", self.method)?;
        if let Some(host) = self.url.as_ref().and_then(Url::host_str)
            && !self.headers.contains_key(HOST)
        {
            write!(f, "Host: {host}\r\n")?;
        }
        write_headers(f, &self.headers)?;
        if let Some(cookies) = self.cookie_header() {
            write!(f, "Cookie: {cookies}\r\n")?;
        }
        f.write_str("\r\n")?;
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

/// The response as received from the wire, body fully read.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    /// Create a response.
    #[must_use]
    pub const fn new(status: StatusCode, version: Version, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            version,
            headers,
            body,
        }
    }

    /// The status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The protocol version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// The headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }
}

impl From<http::Response<Bytes>> for RawResponse {
    fn from(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.status, parts.version, parts.headers, body)
    }
}

impl Reset for RawResponse {
    fn reset(&mut self) {
        self.status = StatusCode::default();
        self.version = Version::default();
        self.headers.clear();
        self.body = Bytes::new();
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}\r\n", self.version, self.status)?;
        write_headers(f, &self.headers)?;
        f.write_str("\r\n")?;
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::invalid_header(format!("{name}: {e}")))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|e| Error::invalid_header(format!("{name}: {e}")))?;
    Ok((header_name, header_value))
}

fn write_headers(f: &mut fmt::Formatter<'_>, headers: &HeaderMap) -> fmt::Result {
    for (name, value) in headers {
        write!(f, "{name}: {}\r\n", String::from_utf8_lossy(value.as_bytes()))?;
    }
    Ok(())
}
