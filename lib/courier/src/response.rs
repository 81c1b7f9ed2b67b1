//! Received responses.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use cookie::Cookie;
use courier_core::{
    Codec, Codecs, DEFAULT_POOL_CAPACITY, Error, Pool, RawResponse, Reset, Result, decode,
};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::{Client, Request};

static RESPONSE_POOL: Pool<Response> = Pool::new(DEFAULT_POOL_CAPACITY);

/// A received response, body fully read.
///
/// The response owns the request that produced it. [`Response::close`]
/// returns both to their pools.
#[derive(Default)]
pub struct Response {
    raw: RawResponse,
    cookies: Vec<Cookie<'static>>,
    cookie_error: Option<Error>,
    request: Option<Request>,
    client: Option<Arc<Client>>,
}

impl Reset for Response {
    fn reset(&mut self) {
        self.raw.reset();
        self.cookies.clear();
        self.cookie_error = None;
        self.request = None;
        self.client = None;
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.raw.status())
            .field("headers", self.raw.headers())
            .field("body", &self.raw.body().len())
            .field("cookies", &self.cookies.len())
            .field("cookie_error", &self.cookie_error)
            .finish_non_exhaustive()
    }
}

impl Response {
    /// Take a response from the pool.
    #[must_use]
    pub fn acquire() -> Self {
        RESPONSE_POOL.acquire()
    }

    /// Reset a response and give it back to the pool.
    ///
    /// The attached request, if any, is dropped; use [`Response::close`] to
    /// recycle it too.
    pub fn release(response: Self) {
        RESPONSE_POOL.release(response);
    }

    /// Release the request, then the response.
    pub fn close(mut self) {
        if let Some(request) = self.request.take() {
            Request::release(request);
        }
        Self::release(self);
    }

    /// The status code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.raw.status()
    }

    /// The reason phrase of the status, empty for unknown codes.
    #[must_use]
    pub fn status(&self) -> &'static str {
        self.raw.status().canonical_reason().unwrap_or_default()
    }

    /// The protocol, such as `HTTP/1.1`.
    #[must_use]
    pub fn protocol(&self) -> String {
        format!("{:?}", self.raw.version())
    }

    /// Returns `true` for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.raw.status().is_success()
    }

    /// The headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    /// First value of a header, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Cookies set by the response.
    ///
    /// Empty when one of the `Set-Cookie` headers failed to parse; see
    /// [`Response::cookie_error`].
    #[must_use]
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// The parse error that made cookie capture give up, if any.
    #[must_use]
    pub const fn cookie_error(&self) -> Option<&Error> {
        self.cookie_error.as_ref()
    }

    /// The raw body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        self.raw.body()
    }

    /// The body as trimmed text, invalid UTF-8 replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.raw.body()).trim().to_string()
    }

    /// Decode the body with the client's JSON codec.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode_with(|codecs| &*codecs.json)
    }

    /// Decode the body with the client's XML codec.
    pub fn xml<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode_with(|codecs| &*codecs.xml)
    }

    /// Decode the body with the client's CBOR codec.
    pub fn cbor<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode_with(|codecs| &*codecs.cbor)
    }

    fn decode_with<T: DeserializeOwned>(&self, pick: impl Fn(&Codecs) -> &dyn Codec) -> Result<T> {
        match &self.client {
            Some(client) => decode(pick(client.codecs()), self.raw.body()),
            None => decode(pick(&Codecs::default()), self.raw.body()),
        }
    }

    /// Write the body to a file, creating missing parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io("create directory", e))?;
        }
        std::fs::write(path, self.raw.body()).map_err(|e| Error::io("write response body", e))
    }

    /// Write the body to `writer`.
    pub fn write_to(&self, mut writer: impl Write) -> Result<()> {
        writer
            .write_all(self.raw.body())
            .map_err(|e| Error::io("write response body", e))
    }

    /// The request that produced this response.
    #[must_use]
    pub const fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// The wire response.
    #[must_use]
    pub const fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub(crate) fn set_raw(&mut self, raw: RawResponse) {
        self.raw = raw;
    }

    pub(crate) fn set_client(&mut self, client: Arc<Client>) {
        self.client = Some(client);
    }

    pub(crate) fn set_cookies(&mut self, cookies: Vec<Cookie<'static>>) {
        self.cookies = cookies;
    }

    pub(crate) fn set_cookie_error(&mut self, error: Error) {
        self.cookie_error = Some(error);
    }

    pub(crate) fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Version};
    use serde::Deserialize;

    use super::*;

    fn response(body: &'static [u8]) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let mut response = Response::default();
        response.set_raw(RawResponse::new(
            StatusCode::CREATED,
            Version::HTTP_2,
            headers,
            Bytes::from_static(body),
        ));
        response
    }

    #[test]
    fn status_line_accessors() {
        let response = response(b"");
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.status(), "Created");
        assert_eq!(response.protocol(), "HTTP/2.0");
        assert!(response.is_success());
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(response(b"  hello\n").text(), "hello");
    }

    #[test]
    fn json_without_client_uses_default_codec() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Created {
            id: u32,
        }

        let response = response(br#"{"id":12}"#);
        assert_eq!(response.json::<Created>().expect("json"), Created { id: 12 });
        assert!(response.xml::<Created>().is_err());
    }

    #[test]
    fn save_creates_directories() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("nested/out.json");

        response(b"{}").save(&target).expect("save");
        assert_eq!(std::fs::read(&target).expect("read"), b"{}");
    }

    #[test]
    fn close_recycles() {
        let mut response = response(b"data");
        response.set_request(Request::new().set_url("http://example.com"));
        response.close();

        let recycled = Response::acquire();
        assert!(recycled.body().is_empty());
        assert!(recycled.request().is_none());
    }
}
