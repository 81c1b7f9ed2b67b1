//! Pluggable transport: `http::Request<Bytes>` in, [`RawResponse`] out.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use courier_core::{Error, RawResponse, Result};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client as LegacyClient, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::ServiceExt;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::config::TransportConfig;
use crate::connector::https_connector;

/// Type-erased transport service.
pub type BoxedService = BoxCloneService<http::Request<Bytes>, RawResponse, Error>;

/// Future returned by [`Transport::call`].
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'static>>;

/// Shared hyper transport used by clients without an explicit one.
static DEFAULT_TRANSPORT: LazyLock<Transport> =
    LazyLock::new(|| Transport::hyper(TransportConfig::default()));

/// Sends wire requests.
///
/// Any tower service with the right request and response types can act as a
/// transport, which lets tests answer from memory:
///
/// ```ignore
/// let transport = Transport::new(tower::service_fn(|request: http::Request<Bytes>| async move {
///     Ok::<_, courier::Error>(RawResponse::default())
/// }));
/// ```
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Mutex<BoxedService>>,
    name: &'static str,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Wrap a tower service.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<http::Request<Bytes>, Response = RawResponse, Error = Error>
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        Self::with_name("custom", service)
    }

    /// Transport backed by hyper with rustls.
    #[must_use]
    pub fn hyper(config: TransportConfig) -> Self {
        Self::with_name("hyper", HyperTransport::new(&config))
    }

    /// The process-wide default hyper transport.
    #[must_use]
    pub fn shared() -> Self {
        DEFAULT_TRANSPORT.clone()
    }

    fn with_name<S>(name: &'static str, service: S) -> Self
    where
        S: Service<http::Request<Bytes>, Response = RawResponse, Error = Error>
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(BoxCloneService::new(service))),
            name,
        }
    }

    /// Send a request.
    pub fn call(&self, request: http::Request<Bytes>) -> TransportFuture {
        // Lock, clone the service, and release the lock immediately
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(service.oneshot(request))
    }
}

#[derive(Clone)]
struct HyperTransport {
    inner: LegacyClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: TransportConfig,
}

impl HyperTransport {
    fn new(config: &TransportConfig) -> Self {
        let inner = LegacyClient::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(config.connect_timeout));

        Self {
            inner,
            config: config.clone(),
        }
    }

    async fn execute(self, request: http::Request<Bytes>) -> Result<RawResponse> {
        let exchange = async {
            let response = self
                .inner
                .request(request.map(Full::new))
                .await
                .map_err(map_hyper_error)?;

            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| Error::connection(e.to_string()))?
                .to_bytes();

            Ok::<_, Error>(RawResponse::new(
                parts.status,
                parts.version,
                parts.headers,
                body,
            ))
        };

        match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout)?,
            None => exchange.await,
        }
    }
}

impl Service<http::Request<Bytes>> for HyperTransport {
    type Response = RawResponse;
    type Error = Error;
    type Future = TransportFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Bytes>) -> Self::Future {
        Box::pin(self.clone().execute(request))
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
    let msg = format!("{err:?}");

    if err.is_connect() {
        return Error::connection(msg);
    }

    let lower = msg.to_ascii_lowercase();
    if lower.contains("tls") || lower.contains("certificate") || lower.contains("ssl") {
        return Error::tls(msg);
    }

    Error::connection(msg)
}
