//! Request and response hooks.

use std::sync::Arc;

use courier_core::Result;

use crate::{Client, Request, Response};

/// Runs after the body is encoded and before the request is sent.
///
/// The request's [`raw`](Request::raw) form is fully composed at that point
/// and can still be changed through [`Request::raw_mut`]. Returning an error
/// aborts the send.
pub type RequestHook = Arc<dyn Fn(&Client, &mut Request) -> Result<()> + Send + Sync>;

/// Runs after a response is received and its cookies are captured.
///
/// Returning an error discards the response and is returned to the caller.
pub type ResponseHook = Arc<dyn Fn(&Client, &mut Response, &Request) -> Result<()> + Send + Sync>;

/// Log the exchange at debug level when the client's debug flag is set.
pub(crate) fn log_exchange(client: &Client, response: &Response, request: &Request) {
    if !client.is_debug() {
        return;
    }
    tracing::debug!(
        target: "courier",
        request = %request.raw(),
        response = %response.raw(),
        "HTTP exchange"
    );
}
