//! Per-request configuration and the send entry points.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{
    Cookies, DEFAULT_BOUNDARY, DEFAULT_POOL_CAPACITY, File, FormData, Header, Method, PathParams,
    Pool, QueryParams, RawRequest, Reset, Result, ToParams,
};
use serde::Serialize;

use crate::config::Config;
use crate::{Client, Response, pipeline};

static REQUEST_POOL: Pool<Request> = Pool::new(DEFAULT_POOL_CAPACITY);

/// A value serialized by one of the client codecs.
pub type Payload = Box<dyn erased_serde::Serialize + Send + Sync>;

/// Future that cancels a request when it completes.
pub type CancelSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// What the request body is made of.
#[derive(Default)]
pub enum Body {
    /// No body.
    #[default]
    None,
    /// Encoded with the client's JSON codec.
    Json(Payload),
    /// Encoded with the client's XML codec.
    Xml(Payload),
    /// Encoded with the client's CBOR codec.
    Cbor(Payload),
    /// The form fields, url-encoded.
    Form,
    /// The form fields and the files, as `multipart/form-data`.
    Files,
    /// Bytes sent as is.
    Raw(Bytes),
}

impl Body {
    /// Name of the body kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Json(_) => "json",
            Self::Xml(_) => "xml",
            Self::Cbor(_) => "cbor",
            Self::Form => "form",
            Self::Files => "files",
            Self::Raw(_) => "raw",
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(bytes) => f.debug_tuple("Raw").field(&bytes.len()).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// One HTTP request.
///
/// Requests are built by value and consumed by [`Request::send`]:
///
/// ```ignore
/// let response = client
///     .r()
///     .set_path_param("id", "42")
///     .set_param("expand", "owner")
///     .set_json(NewName { name: "courier" })
///     .patch("/repos/:id")
///     .await?;
/// ```
///
/// Values set here take precedence over the client's values. Once sent, the
/// request travels with its [`Response`] and goes back to the request pool
/// when the response is closed.
pub struct Request {
    url: String,
    method: Method,
    header: Header,
    params: QueryParams,
    path_params: PathParams,
    cookies: Cookies,
    form_data: FormData,
    files: Vec<File>,
    body: Body,
    boundary: String,
    user_agent: String,
    referer: String,
    timeout: Option<Duration>,
    cancel: Option<CancelSignal>,
    client: Option<Arc<Client>>,
    raw: RawRequest,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: Method::Get,
            header: Header::new(),
            params: QueryParams::new(),
            path_params: PathParams::new(),
            cookies: Cookies::new(),
            form_data: FormData::new(),
            files: Vec::new(),
            body: Body::None,
            boundary: DEFAULT_BOUNDARY.to_string(),
            user_agent: String::new(),
            referer: String::new(),
            timeout: None,
            cancel: None,
            client: None,
            raw: RawRequest::new(),
        }
    }
}

impl Reset for Request {
    fn reset(&mut self) {
        self.url.clear();
        self.method = Method::Get;
        self.header.reset();
        self.params.reset();
        self.path_params.reset();
        self.cookies.reset();
        self.form_data.reset();
        self.files.clear();
        self.body = Body::None;
        self.boundary.clear();
        self.boundary.push_str(DEFAULT_BOUNDARY);
        self.user_agent.clear();
        self.referer.clear();
        self.timeout = None;
        self.cancel = None;
        self.client = None;
        self.raw.reset();
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("header", &self.header)
            .field("params", &self.params)
            .field("path_params", &self.path_params)
            .field("body", &self.body)
            .field("files", &self.files.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// A fresh request that is not bound to a client.
    ///
    /// Unbound requests are sent through the default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a request from the pool.
    #[must_use]
    pub fn acquire() -> Self {
        REQUEST_POOL.acquire()
    }

    /// Reset a request and give it back to the pool.
    pub fn release(request: Self) {
        REQUEST_POOL.release(request);
    }

    // ------------------------------------------------------------------
    // Target
    // ------------------------------------------------------------------

    /// Set the URL, absolute or relative to the client base URL. `:name`
    /// segments are replaced by path parameters.
    #[must_use]
    pub fn set_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the method.
    #[must_use]
    pub const fn set_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Bind the request to a client.
    #[must_use]
    pub fn set_client(mut self, client: Arc<Client>) -> Self {
        self.client = Some(client);
        self
    }

    /// The URL as set.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// The client the request is bound to.
    #[must_use]
    pub const fn client(&self) -> Option<&Arc<Client>> {
        self.client.as_ref()
    }

    // ------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------

    /// Append a header value.
    #[must_use]
    pub fn add_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.add(key, value);
        self
    }

    /// Set a header, replacing the client's values for that key.
    #[must_use]
    pub fn set_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.set(key, value);
        self
    }

    /// Append several header values.
    #[must_use]
    pub fn add_headers<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.header.add_all(pairs);
        self
    }

    /// Set several headers.
    #[must_use]
    pub fn set_headers<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.header.set_all(pairs);
        self
    }

    /// Set the headers enumerated by `params`.
    #[must_use]
    pub fn set_headers_with<P: ToParams + ?Sized>(mut self, params: &P) -> Self {
        self.header.set_with(params);
        self
    }

    /// Remove headers.
    #[must_use]
    pub fn del_headers<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.header.del(keys);
        self
    }

    /// The headers.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable access to the headers.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    // ------------------------------------------------------------------
    // Query parameters
    // ------------------------------------------------------------------

    /// Append a query parameter.
    #[must_use]
    pub fn add_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.add(key, value);
        self
    }

    /// Set a query parameter.
    #[must_use]
    pub fn set_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.set(key, value);
        self
    }

    /// Append several query parameters.
    #[must_use]
    pub fn add_params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.add_all(pairs);
        self
    }

    /// Set several query parameters.
    #[must_use]
    pub fn set_params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.set_all(pairs);
        self
    }

    /// Set the query parameters enumerated by `params`.
    #[must_use]
    pub fn set_params_with<P: ToParams + ?Sized>(mut self, params: &P) -> Self {
        self.params.set_with(params);
        self
    }

    /// Remove query parameters.
    #[must_use]
    pub fn del_params<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.params.del(keys);
        self
    }

    /// The query parameters.
    #[must_use]
    pub const fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Mutable access to the query parameters.
    pub fn params_mut(&mut self) -> &mut QueryParams {
        &mut self.params
    }

    // ------------------------------------------------------------------
    // Path parameters
    // ------------------------------------------------------------------

    /// Set a path parameter.
    #[must_use]
    pub fn set_path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.set(key, value);
        self
    }

    /// Set several path parameters.
    #[must_use]
    pub fn set_path_params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.path_params.set_all(pairs);
        self
    }

    /// Set the path parameters enumerated by `params`.
    #[must_use]
    pub fn set_path_params_with<P: ToParams + ?Sized>(mut self, params: &P) -> Self {
        self.path_params.set_with(params);
        self
    }

    /// Remove path parameters.
    #[must_use]
    pub fn del_path_params<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.path_params.del(keys);
        self
    }

    /// The path parameters.
    #[must_use]
    pub const fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Mutable access to the path parameters.
    pub fn path_params_mut(&mut self) -> &mut PathParams {
        &mut self.path_params
    }

    // ------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------

    /// Set a cookie.
    #[must_use]
    pub fn set_cookie(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.set(key, value);
        self
    }

    /// Set several cookies.
    #[must_use]
    pub fn set_cookies<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies.set_all(pairs);
        self
    }

    /// Set the cookies enumerated by `params`.
    #[must_use]
    pub fn set_cookies_with<P: ToParams + ?Sized>(mut self, params: &P) -> Self {
        self.cookies.set_with(params);
        self
    }

    /// Remove cookies.
    #[must_use]
    pub fn del_cookies<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.cookies.del(keys);
        self
    }

    /// The cookies.
    #[must_use]
    pub const fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// Mutable access to the cookies.
    pub fn cookies_mut(&mut self) -> &mut Cookies {
        &mut self.cookies
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Set the User-Agent, overriding the client's.
    #[must_use]
    pub fn set_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the Referer, overriding the client's.
    #[must_use]
    pub fn set_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    /// The User-Agent override, possibly empty.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The Referer override, possibly empty.
    #[must_use]
    pub fn referer(&self) -> &str {
        &self.referer
    }

    // ------------------------------------------------------------------
    // Body
    // ------------------------------------------------------------------

    /// Send `value` encoded with the client's JSON codec.
    #[must_use]
    pub fn set_json<T: Serialize + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.body = Body::Json(Box::new(value));
        self
    }

    /// Send `value` encoded with the client's XML codec.
    #[must_use]
    pub fn set_xml<T: Serialize + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.body = Body::Xml(Box::new(value));
        self
    }

    /// Send `value` encoded with the client's CBOR codec.
    #[must_use]
    pub fn set_cbor<T: Serialize + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.body = Body::Cbor(Box::new(value));
        self
    }

    /// Send bytes as they are.
    #[must_use]
    pub fn set_raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Raw(body.into());
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn set_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Append a form field. The body becomes url-encoded form data unless
    /// files are attached.
    #[must_use]
    pub fn add_form_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.add(key, value);
        self.use_form_body();
        self
    }

    /// Set a form field. The body becomes url-encoded form data unless files
    /// are attached.
    #[must_use]
    pub fn set_form_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data.set(key, value);
        self.use_form_body();
        self
    }

    /// Set the form fields enumerated by `params`.
    #[must_use]
    pub fn set_form_data_with<P: ToParams + ?Sized>(mut self, params: &P) -> Self {
        self.form_data.set_with(params);
        self.use_form_body();
        self
    }

    /// Remove form fields.
    #[must_use]
    pub fn del_form_data<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.form_data.del(keys);
        self
    }

    /// Attach a file. The body becomes `multipart/form-data`.
    #[must_use]
    pub fn add_file(mut self, file: File) -> Self {
        self.files.push(file);
        self.body = Body::Files;
        self
    }

    /// Attach several files.
    #[must_use]
    pub fn add_files(mut self, files: impl IntoIterator<Item = File>) -> Self {
        self.files.extend(files);
        self.body = Body::Files;
        self
    }

    /// Set the multipart boundary.
    ///
    /// Requests keeping the default boundary get a random suffix appended.
    #[must_use]
    pub fn set_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    fn use_form_body(&mut self) {
        if !matches!(self.body, Body::Files) {
            self.body = Body::Form;
        }
    }

    /// The body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// The form fields.
    #[must_use]
    pub const fn form_data(&self) -> &FormData {
        &self.form_data
    }

    /// Mutable access to the form fields.
    pub fn form_data_mut(&mut self) -> &mut FormData {
        &mut self.form_data
    }

    /// The attached files.
    #[must_use]
    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// Mutable access to the attached files.
    pub fn files_mut(&mut self) -> &mut Vec<File> {
        &mut self.files
    }

    /// The multipart boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    // ------------------------------------------------------------------
    // Deadline
    // ------------------------------------------------------------------

    /// Fail with [`Error::Timeout`](crate::Error::Timeout) if no response
    /// arrives in time. Overrides the client timeout.
    #[must_use]
    pub const fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fail with [`Error::Cancelled`](crate::Error::Cancelled) as soon as
    /// `signal` completes.
    #[must_use]
    pub fn cancel_on(mut self, signal: impl Future<Output = ()> + Send + 'static) -> Self {
        self.cancel = Some(Box::pin(signal));
        self
    }

    /// The timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn take_cancel(&mut self) -> Option<CancelSignal> {
        self.cancel.take()
    }

    pub(crate) fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    pub(crate) fn restore_body(&mut self, body: Body) {
        self.body = body;
    }

    pub(crate) fn multipart_parts(&mut self) -> (&FormData, &mut [File]) {
        (&self.form_data, &mut self.files)
    }

    // ------------------------------------------------------------------
    // Wire form
    // ------------------------------------------------------------------

    /// The wire request, composed when the request is sent.
    #[must_use]
    pub const fn raw(&self) -> &RawRequest {
        &self.raw
    }

    /// Mutable access to the wire request, for request hooks.
    pub fn raw_mut(&mut self) -> &mut RawRequest {
        &mut self.raw
    }

    // ------------------------------------------------------------------
    // Configuration struct
    // ------------------------------------------------------------------

    /// Apply a [`Config`].
    #[must_use]
    pub fn apply(mut self, config: Config) -> Self {
        let Config {
            user_agent,
            referer,
            header,
            params,
            cookies,
            path_params,
            timeout,
            json,
            form_data,
            files,
        } = config;

        if let Some(user_agent) = user_agent {
            self.user_agent = user_agent;
        }
        if let Some(referer) = referer {
            self.referer = referer;
        }
        self.header.set_all(header.iter());
        self.params.set_all(params.iter());
        self.cookies.set_all(cookies.iter());
        self.path_params.set_all(path_params.iter());
        if timeout.is_some() {
            self.timeout = timeout;
        }
        if !form_data.is_empty() {
            self.form_data.set_all(form_data.iter());
            self.use_form_body();
        }
        if !files.is_empty() {
            self.files.extend(files);
            self.body = Body::Files;
        }
        if let Some(json) = json {
            self.body = Body::Json(Box::new(json));
        }
        self
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send the request through its client, or the default client when it
    /// is not bound to one.
    pub async fn send(self) -> Result<Response> {
        let client = self.client.clone().unwrap_or_else(crate::default::client);
        pipeline::execute(client, self).await
    }

    /// Send a GET request to `url`.
    pub async fn get(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Get).set_url(url).send().await
    }

    /// Send a POST request to `url`.
    pub async fn post(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Post).set_url(url).send().await
    }

    /// Send a PUT request to `url`.
    pub async fn put(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Put).set_url(url).send().await
    }

    /// Send a PATCH request to `url`.
    pub async fn patch(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Patch).set_url(url).send().await
    }

    /// Send a DELETE request to `url`.
    pub async fn delete(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Delete).set_url(url).send().await
    }

    /// Send a HEAD request to `url`.
    pub async fn head(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Head).set_url(url).send().await
    }

    /// Send an OPTIONS request to `url`.
    pub async fn options(self, url: impl Into<String>) -> Result<Response> {
        self.set_method(Method::Options).set_url(url).send().await
    }
}
