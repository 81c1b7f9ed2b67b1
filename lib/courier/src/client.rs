//! Long-lived client configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use courier_core::{
    Codec, Codecs, CookieJar, Cookies, DEFAULT_POOL_CAPACITY, Header, Method, PathParams, Pool,
    QueryParams, Reset, Result, ToParams,
};

use crate::config::Config;
use crate::hooks::{RequestHook, ResponseHook};
use crate::transport::Transport;
use crate::{Request, Response};

static CLIENT_POOL: Pool<Client> = Pool::new(DEFAULT_POOL_CAPACITY);

/// Settings shared by every request issued through a client.
///
/// Configure the client through `&mut self` setters, then share it as an
/// `Arc<Client>`. A shared client is read without locking and cannot be
/// mutated, so in-flight requests always see a consistent configuration.
///
/// ```ignore
/// let mut client = Client::new();
/// client
///     .set_base_url("https://api.github.com")
///     .set_header("Accept", "application/vnd.github+json")
///     .set_timeout(Duration::from_secs(10));
/// let client = client.into_shared();
///
/// let response = client.get("/repos/rust-lang/rust").await?;
/// ```
#[derive(Default)]
pub struct Client {
    base_url: String,
    user_agent: String,
    referer: String,
    header: Header,
    params: QueryParams,
    path_params: PathParams,
    cookies: Cookies,
    timeout: Option<Duration>,
    codecs: Codecs,
    request_hooks: Vec<RequestHook>,
    response_hooks: Vec<ResponseHook>,
    cookie_jar: Option<Arc<dyn CookieJar>>,
    debug: bool,
    transport: Option<Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("referer", &self.referer)
            .field("header", &self.header)
            .field("params", &self.params)
            .field("path_params", &self.path_params)
            .field("cookies", &self.cookies)
            .field("timeout", &self.timeout)
            .field("codecs", &self.codecs)
            .field("request_hooks", &self.request_hooks.len())
            .field("response_hooks", &self.response_hooks.len())
            .field("cookie_jar", &self.cookie_jar)
            .field("debug", &self.debug)
            .field("transport", &self.transport)
            .finish()
    }
}

impl Reset for Client {
    /// Clear the configuration, hooks and cookie jar. The transport is kept.
    fn reset(&mut self) {
        self.base_url.clear();
        self.user_agent.clear();
        self.referer.clear();
        self.header.reset();
        self.params.reset();
        self.path_params.reset();
        self.cookies.reset();
        self.timeout = None;
        self.codecs = Codecs::default();
        self.request_hooks.clear();
        self.response_hooks.clear();
        self.cookie_jar = None;
        self.debug = false;
    }
}

impl Client {
    /// Create a client using the shared hyper transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a client from the pool.
    #[must_use]
    pub fn acquire() -> Self {
        CLIENT_POOL.acquire()
    }

    /// Reset a client and give it back to the pool.
    pub fn release(client: Self) {
        CLIENT_POOL.release(client);
    }

    /// Share the client.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // ------------------------------------------------------------------
    // Target
    // ------------------------------------------------------------------

    /// Set the base URL prepended to relative request URLs.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = base_url.into();
        self
    }

    /// The base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------

    /// Append a header value.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.header.add(key, value);
        self
    }

    /// Set a header.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.header.set(key, value);
        self
    }

    /// Append several header values.
    pub fn add_headers<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.header.add_all(pairs);
        self
    }

    /// Set several headers.
    pub fn set_headers<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.header.set_all(pairs);
        self
    }

    /// Set the headers enumerated by `params`.
    pub fn set_headers_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.header.set_with(params);
        self
    }

    /// Remove headers.
    pub fn del_headers<I>(&mut self, keys: I) -> &mut Self
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

    // ------------------------------------------------------------------
    // Query parameters
    // ------------------------------------------------------------------

    /// Append a query parameter.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.add(key, value);
        self
    }

    /// Set a query parameter.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.set(key, value);
        self
    }

    /// Append several query parameters.
    pub fn add_params<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.add_all(pairs);
        self
    }

    /// Set several query parameters.
    pub fn set_params<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.set_all(pairs);
        self
    }

    /// Set the query parameters enumerated by `params`.
    pub fn set_params_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.params.set_with(params);
        self
    }

    /// Remove query parameters.
    pub fn del_params<I>(&mut self, keys: I) -> &mut Self
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

    // ------------------------------------------------------------------
    // Path parameters
    // ------------------------------------------------------------------

    /// Set a path parameter.
    pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.path_params.set(key, value);
        self
    }

    /// Set several path parameters.
    pub fn set_path_params<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.path_params.set_all(pairs);
        self
    }

    /// Set the path parameters enumerated by `params`.
    pub fn set_path_params_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.path_params.set_with(params);
        self
    }

    /// Remove path parameters.
    pub fn del_path_params<I>(&mut self, keys: I) -> &mut Self
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

    // ------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------

    /// Set a cookie.
    pub fn set_cookie(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.cookies.set(key, value);
        self
    }

    /// Set several cookies.
    pub fn set_cookies<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies.set_all(pairs);
        self
    }

    /// Set the cookies enumerated by `params`.
    pub fn set_cookies_with<P: ToParams + ?Sized>(&mut self, params: &P) -> &mut Self {
        self.cookies.set_with(params);
        self
    }

    /// Remove cookies.
    pub fn del_cookies<I>(&mut self, keys: I) -> &mut Self
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

    /// Attach a cookie jar. Response cookies are stored in it and matching
    /// cookies are sent with later requests.
    pub fn set_cookie_jar(&mut self, jar: Arc<dyn CookieJar>) -> &mut Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// The cookie jar.
    #[must_use]
    pub fn cookie_jar(&self) -> Option<&dyn CookieJar> {
        self.cookie_jar.as_deref()
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Set the User-Agent.
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The User-Agent, possibly empty.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Set the Referer.
    pub fn set_referer(&mut self, referer: impl Into<String>) -> &mut Self {
        self.referer = referer.into();
        self
    }

    /// The Referer, possibly empty.
    #[must_use]
    pub fn referer(&self) -> &str {
        &self.referer
    }

    // ------------------------------------------------------------------
    // Behaviour
    // ------------------------------------------------------------------

    /// Set the timeout of requests that do not set their own.
    pub const fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// The timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Log every exchange at debug level.
    pub const fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Returns `true` if exchanges are logged.
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Replace the codec set.
    pub fn set_codecs(&mut self, codecs: Codecs) -> &mut Self {
        self.codecs = codecs;
        self
    }

    /// Replace the JSON codec.
    pub fn set_json_codec(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs.json = codec;
        self
    }

    /// Replace the XML codec.
    pub fn set_xml_codec(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs.xml = codec;
        self
    }

    /// Replace the CBOR codec.
    pub fn set_cbor_codec(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs.cbor = codec;
        self
    }

    /// The codec set.
    #[must_use]
    pub const fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    /// Send requests through `transport` instead of the shared hyper one.
    pub fn set_transport(&mut self, transport: Transport) -> &mut Self {
        self.transport = Some(transport);
        self
    }

    /// The transport requests go through.
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.transport.clone().unwrap_or_else(Transport::shared)
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Register a hook run before each request is sent.
    pub fn add_request_hook<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Self, &mut Request) -> Result<()> + Send + Sync + 'static,
    {
        self.request_hooks.push(Arc::new(hook));
        self
    }

    /// Register a hook run after each response is received.
    pub fn add_response_hook<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Self, &mut Response, &Request) -> Result<()> + Send + Sync + 'static,
    {
        self.response_hooks.push(Arc::new(hook));
        self
    }

    /// The registered request hooks, in run order.
    #[must_use]
    pub fn request_hooks(&self) -> &[RequestHook] {
        &self.request_hooks
    }

    /// The registered response hooks, in run order.
    #[must_use]
    pub fn response_hooks(&self) -> &[ResponseHook] {
        &self.response_hooks
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// A pooled request bound to this client.
    #[must_use]
    pub fn r(self: &Arc<Self>) -> Request {
        Request::acquire().set_client(Arc::clone(self))
    }

    /// Send a GET request.
    pub async fn get(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().get(url).await
    }

    /// Send a POST request.
    pub async fn post(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().post(url).await
    }

    /// Send a PUT request.
    pub async fn put(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().put(url).await
    }

    /// Send a PATCH request.
    pub async fn patch(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().patch(url).await
    }

    /// Send a DELETE request.
    pub async fn delete(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().delete(url).await
    }

    /// Send a HEAD request.
    pub async fn head(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().head(url).await
    }

    /// Send an OPTIONS request.
    pub async fn options(self: &Arc<Self>, url: impl Into<String>) -> Result<Response> {
        self.r().options(url).await
    }

    /// Send a request configured by a [`Config`].
    pub async fn send(
        self: &Arc<Self>,
        method: Method,
        url: impl Into<String>,
        config: Config,
    ) -> Result<Response> {
        self.r()
            .set_method(method)
            .set_url(url)
            .apply(config)
            .send()
            .await
    }
}
