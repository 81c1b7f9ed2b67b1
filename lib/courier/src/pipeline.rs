//! From a [`Request`] to a [`Response`].
//!
//! Stages run in a fixed order: URL, headers and cookies, body, request
//! hooks, transport, cookie capture, response hooks. The first failing stage
//! ends the exchange and its error is returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{
    DEFAULT_BOUNDARY, Error, RawRequest, RawResponse, Result, encode_multipart, parse_set_cookies,
    randomize_boundary,
};
use http::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use tracing::Instrument;
use url::Url;

use crate::hooks::log_exchange;
use crate::request::{Body, CancelSignal, Payload};
use crate::transport::Transport;
use crate::{Client, Request, Response};

/// User-Agent sent when neither the client nor the request sets one.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Send `request` through `client`.
pub(crate) async fn execute(client: Arc<Client>, mut request: Request) -> Result<Response> {
    let wire = match prepare(&client, &mut request).and_then(|()| request.raw().to_http()) {
        Ok(wire) => wire,
        Err(error) => {
            Request::release(request);
            return Err(error);
        }
    };

    let url = request.raw().url().cloned();
    let timeout = request.timeout().or_else(|| client.timeout());
    let cancel = request.take_cancel();
    let span = tracing::debug_span!(
        "courier.send",
        method = %request.method(),
        url = url.as_ref().map_or("", Url::as_str),
    );

    let raw = match round_trip(client.transport(), wire, timeout, cancel)
        .instrument(span)
        .await
    {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(target: "courier", %error, "request failed");
            Request::release(request);
            return Err(error);
        }
    };

    let mut response = Response::acquire();
    response.set_raw(raw);
    response.set_client(Arc::clone(&client));
    if let Some(url) = &url {
        capture_cookies(&client, url, &mut response);
    }

    log_exchange(&client, &response, &request);

    if response.cookie_error().is_none() {
        for hook in client.response_hooks() {
            if let Err(error) = hook(client.as_ref(), &mut response, &request) {
                Response::release(response);
                Request::release(request);
                return Err(error);
            }
        }
    }

    response.set_request(request);
    Ok(response)
}

/// Compose the wire request, then run the request hooks.
pub(crate) fn prepare(client: &Client, request: &mut Request) -> Result<()> {
    let mut raw = RawRequest::new();
    raw.set_method(request.method());
    raw.set_url(compose_url(client, request)?);

    let boundary = if request.boundary() == DEFAULT_BOUNDARY {
        randomize_boundary(DEFAULT_BOUNDARY)
    } else {
        request.boundary().to_string()
    };

    compose_headers(client, request, &mut raw, &boundary)?;
    let body = encode_body(client, request, &boundary)?;
    raw.set_body(body);
    *request.raw_mut() = raw;

    for hook in client.request_hooks() {
        hook(client, request)?;
    }
    Ok(())
}

async fn round_trip(
    transport: Transport,
    wire: http::Request<Bytes>,
    timeout: Option<Duration>,
    cancel: Option<CancelSignal>,
) -> Result<RawResponse> {
    let exchange = async move {
        let Some(timeout) = timeout else {
            return transport.call(wire).await;
        };
        tokio::time::timeout(timeout, transport.call(wire))
            .await
            .unwrap_or(Err(Error::Timeout))
    };

    match cancel {
        Some(cancel) => tokio::select! {
            result = exchange => result,
            () = cancel => Err(Error::Cancelled),
        },
        None => exchange.await,
    }
}

// ----------------------------------------------------------------------
// URL
// ----------------------------------------------------------------------

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Build the target URL: base URL, path parameters, merged query.
pub(crate) fn compose_url(client: &Client, request: &Request) -> Result<Url> {
    let (rest, fragment) = match request.url().split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (request.url(), None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let target = if is_absolute(path) {
        path.to_string()
    } else {
        format!("{}{path}", client.base_url())
    };
    if !is_absolute(&target) {
        return Err(Error::url_format(target));
    }

    let target = substitute_path_params(&target, client, request);
    let mut url = Url::parse(&target).map_err(|e| Error::url_format(format!("{target}: {e}")))?;

    url.set_query(query);
    if !client.params().is_empty() || !request.params().is_empty() {
        url.query_pairs_mut()
            .extend_pairs(client.params().iter())
            .extend_pairs(request.params().iter());
    }
    url.set_fragment(fragment);
    Ok(url)
}

/// Replace `:name` tokens of the URL path, request values first.
// Slice bounds all come from `find` on ASCII characters.
#[allow(clippy::indexing_slicing)]
fn substitute_path_params(target: &str, client: &Client, request: &Request) -> String {
    let path_start = target
        .find("://")
        .map(|scheme_end| scheme_end + 3)
        .and_then(|authority| target[authority..].find('/').map(|i| authority + i))
        .unwrap_or(target.len());
    let (head, path) = target.split_at(path_start);

    let mut out = String::with_capacity(target.len());
    out.push_str(head);

    let mut rest = path;
    while let Some(colon) = rest.find(':') {
        out.push_str(&rest[..colon]);
        let after = &rest[colon + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];

        let value = (!name.is_empty())
            .then(|| {
                request
                    .path_params()
                    .get(name)
                    .or_else(|| client.path_params().get(name))
            })
            .flatten();
        match value {
            Some(value) => out.push_str(value),
            None => {
                out.push(':');
                out.push_str(name);
            }
        }
        rest = &after[name_len..];
    }
    out.push_str(rest);
    out
}

// ----------------------------------------------------------------------
// Headers and cookies
// ----------------------------------------------------------------------

fn compose_headers(
    client: &Client,
    request: &Request,
    raw: &mut RawRequest,
    boundary: &str,
) -> Result<()> {
    for (key, value) in client.header().iter() {
        if !request.header().is_overridden(key) {
            raw.add_header(key, value)?;
        }
    }
    for (key, value) in request.header().iter() {
        raw.add_header(key, value)?;
    }

    let codecs = client.codecs();
    let content_type = match request.body() {
        Body::Json(_) => Some(codecs.json.content_type()),
        Body::Xml(_) => Some(codecs.xml.content_type()),
        Body::Cbor(_) => Some(codecs.cbor.content_type()),
        Body::Form => Some("application/x-www-form-urlencoded"),
        Body::Files | Body::None | Body::Raw(_) => None,
    };
    if let Some(content_type) = content_type
        && !raw.has_header(CONTENT_TYPE.as_str())
    {
        raw.set_header(CONTENT_TYPE.as_str(), content_type)?;
    }
    if matches!(request.body(), Body::Json(_)) && !raw.has_header(ACCEPT.as_str()) {
        raw.set_header(ACCEPT.as_str(), codecs.json.content_type())?;
    }
    if matches!(request.body(), Body::Files) {
        raw.set_header(
            CONTENT_TYPE.as_str(),
            &format!("multipart/form-data; boundary={boundary}"),
        )?;
    }

    let user_agent = [request.user_agent(), client.user_agent()]
        .into_iter()
        .find(|ua| !ua.is_empty())
        .unwrap_or(DEFAULT_USER_AGENT);
    raw.set_header(USER_AGENT.as_str(), user_agent)?;

    if let Some(referer) = [request.referer(), client.referer()]
        .into_iter()
        .find(|r| !r.is_empty())
    {
        raw.set_header(REFERER.as_str(), referer)?;
    }

    if let Some(jar) = client.cookie_jar() {
        jar.dump_cookies_to_request(raw);
    }
    for (name, value) in client.cookies().iter() {
        raw.set_cookie(name, value);
    }
    for (name, value) in request.cookies().iter() {
        raw.set_cookie(name, value);
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Body
// ----------------------------------------------------------------------

fn marshal(codec: &dyn courier_core::Codec, payload: &Payload) -> Result<Bytes> {
    codec.marshal(&**payload).map(Bytes::from)
}

fn encode_body(client: &Client, request: &mut Request, boundary: &str) -> Result<Bytes> {
    let body = request.take_body();
    let codecs = client.codecs();
    let encoded = match &body {
        Body::None => Ok(Bytes::new()),
        Body::Json(payload) => marshal(&*codecs.json, payload),
        Body::Xml(payload) => marshal(&*codecs.xml, payload),
        Body::Cbor(payload) => marshal(&*codecs.cbor, payload),
        Body::Form => request.form_data().to_query_string().map(Bytes::from),
        Body::Files if request.files().is_empty() => {
            Err(Error::body_type("a multipart body needs at least one file"))
        }
        Body::Files => {
            let (form, files) = request.multipart_parts();
            encode_multipart(boundary, form, files)
        }
        Body::Raw(bytes) => Ok(bytes.clone()),
    };
    request.restore_body(body);
    encoded
}

// ----------------------------------------------------------------------
// Response cookies
// ----------------------------------------------------------------------

/// Parse the response cookies and store them in the jar.
///
/// A single invalid `Set-Cookie` header drops the whole batch.
fn capture_cookies(client: &Client, url: &Url, response: &mut Response) {
    let parsed = match client.cookie_jar() {
        Some(jar) => jar.parse_cookies_from_response(url, response.raw()),
        None => parse_set_cookies(response.headers()),
    };
    match parsed {
        Ok(cookies) => response.set_cookies(cookies),
        Err(error) => {
            tracing::warn!(target: "courier", %error, url = %url, "ignoring response cookies");
            response.set_cookie_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::let_assert;
    use courier_core::File;
    use serde::Serialize;

    use super::*;

    fn url_of(client: &Client, request: &Request) -> String {
        compose_url(client, request).expect("url").to_string()
    }

    #[test]
    fn base_url_is_prepended() {
        let mut client = Client::new();
        client.set_base_url("http://example.com/api");

        assert_eq!(
            url_of(&client, &Request::new().set_url("/v1")),
            "http://example.com/api/v1"
        );
        assert_eq!(
            url_of(&client, &Request::new()),
            "http://example.com/api"
        );
        assert_eq!(
            url_of(&client, &Request::new().set_url("https://other.org/x")),
            "https://other.org/x"
        );
    }

    #[test]
    fn relative_url_without_base_fails() {
        let_assert!(
            Err(Error::UrlFormat(_)) = compose_url(&Client::new(), &Request::new().set_url("/v1"))
        );
    }

    #[test]
    fn braces_are_escaped() {
        let request = Request::new().set_url("http://example.com/{key}");
        assert_eq!(
            url_of(&Client::new(), &request),
            "http://example.com/%7Bkey%7D"
        );
    }

    #[test]
    fn request_path_params_win() {
        let mut client = Client::new();
        client
            .set_base_url("http://example.com:8080")
            .set_path_params([("id", "1"), ("kind", "fiber")]);
        let request = Request::new()
            .set_url("/api/:id/:kind/:unknown")
            .set_path_param("id", "12");

        assert_eq!(
            url_of(&client, &request),
            "http://example.com:8080/api/12/fiber/:unknown"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let request = Request::new()
            .set_url("http://example.com/:a/:b")
            .set_path_params([("a", ":b"), ("b", "val")]);
        assert_eq!(
            url_of(&Client::new(), &request),
            "http://example.com/:b/val"
        );
    }

    #[test]
    fn query_is_merged_and_fragment_kept() {
        let mut client = Client::new();
        client.add_param("bar", "foo2");
        let request = Request::new()
            .set_url("http://example.com/p?bar=foo1#top")
            .add_param("bar", "foo");

        let url = compose_url(&client, &request).expect("url");
        let values: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "bar")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(values, ["foo1", "foo2", "foo"]);
        assert_eq!(url.fragment(), Some("top"));
    }

    #[test]
    fn request_set_header_replaces_client_values() {
        let mut client = Client::new();
        client
            .add_header("X-Trace", "client")
            .add_header("X-Shared", "client");
        let mut request = Request::new()
            .set_url("http://example.com")
            .set_header("x-trace", "request")
            .add_header("X-Shared", "request");

        prepare(&client, &mut request).expect("prepare");

        let headers = request.raw().headers();
        let trace: Vec<_> = headers.get_all("x-trace").iter().collect();
        assert_eq!(trace, ["request"]);
        let shared: Vec<_> = headers.get_all("x-shared").iter().collect();
        assert_eq!(shared, ["client", "request"]);
    }

    #[test]
    fn identity_headers_follow_precedence() {
        let mut client = Client::new();
        client.set_user_agent("client-agent").set_referer("http://client");

        let mut request = Request::new().set_url("http://example.com");
        prepare(&Client::new(), &mut request).expect("prepare");
        assert_eq!(request.raw().header("user-agent"), Some(DEFAULT_USER_AGENT));
        assert_eq!(request.raw().header("referer"), None);

        let mut request = Request::new().set_url("http://example.com");
        prepare(&client, &mut request).expect("prepare");
        assert_eq!(request.raw().header("user-agent"), Some("client-agent"));
        assert_eq!(request.raw().header("referer"), Some("http://client"));

        let mut request = Request::new()
            .set_url("http://example.com")
            .set_user_agent("request-agent")
            .set_referer("http://request");
        prepare(&client, &mut request).expect("prepare");
        assert_eq!(request.raw().header("user-agent"), Some("request-agent"));
        assert_eq!(request.raw().header("referer"), Some("http://request"));
    }

    #[test]
    fn request_cookies_override_client_cookies() {
        let mut client = Client::new();
        client.set_cookies([("session", "client"), ("theme", "dark")]);
        let mut request = Request::new()
            .set_url("http://example.com")
            .set_cookie("session", "request");

        prepare(&client, &mut request).expect("prepare");
        assert_eq!(request.raw().cookie("session"), Some("request"));
        assert_eq!(request.raw().cookie("theme"), Some("dark"));
    }

    #[test]
    fn json_body_sets_content_type_and_accept() {
        #[derive(Serialize)]
        struct Ping {
            id: u32,
        }

        let mut request = Request::new()
            .set_url("http://example.com")
            .set_json(Ping { id: 3 });
        prepare(&Client::new(), &mut request).expect("prepare");

        assert_eq!(request.raw().header("content-type"), Some("application/json"));
        assert_eq!(request.raw().header("accept"), Some("application/json"));
        assert_eq!(request.raw().body(), &Bytes::from_static(br#"{"id":3}"#));
        assert_eq!(request.body().kind(), "json");
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let mut request = Request::new()
            .set_url("http://example.com")
            .set_header("Content-Type", "text/plain")
            .set_form_data("a", "1");
        prepare(&Client::new(), &mut request).expect("prepare");

        assert_eq!(request.raw().header("content-type"), Some("text/plain"));
        assert_eq!(request.raw().body(), &Bytes::from_static(b"a=1"));
    }

    #[test]
    fn multipart_boundary_is_randomized() {
        let mut request = Request::new()
            .set_url("http://example.com")
            .set_form_data("k", "v")
            .add_file(File::from_reader("a.txt", std::io::Cursor::new(b"content".to_vec())));
        prepare(&Client::new(), &mut request).expect("prepare");

        let content_type = request.raw().header("content-type").expect("content type");
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .expect("multipart");
        assert_eq!(boundary.len(), DEFAULT_BOUNDARY.len() + 16);

        let body = String::from_utf8_lossy(request.raw().body()).into_owned();
        assert!(body.contains(boundary));
        assert!(body.contains("content"));
        assert!(body.contains("name=\"k\""));
    }

    #[test]
    fn custom_boundary_is_kept() {
        let mut request = Request::new()
            .set_url("http://example.com")
            .set_boundary("fixed")
            .add_file(File::from_reader("a.txt", std::io::Cursor::new(Vec::new())));
        prepare(&Client::new(), &mut request).expect("prepare");

        assert_eq!(
            request.raw().header("content-type"),
            Some("multipart/form-data; boundary=fixed")
        );
    }

    #[test]
    fn files_body_without_files_fails() {
        let mut request = Request::new()
            .set_url("http://example.com")
            .set_body(Body::Files);
        let_assert!(Err(Error::BodyType(_)) = prepare(&Client::new(), &mut request));
    }

    #[test]
    fn request_hook_error_aborts() {
        let mut client = Client::new();
        client.add_request_hook(|_, request| {
            assert!(request.raw().url().is_some());
            Err(Error::hook("denied"))
        });
        let mut request = Request::new().set_url("http://example.com");
        let_assert!(Err(Error::Hook(message)) = prepare(&client, &mut request));
        assert_eq!(message, "denied");
    }
}
