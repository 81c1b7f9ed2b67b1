//! Process-wide default client.
//!
//! The shorthand functions of the crate root (`courier::get` and friends)
//! send through this client. Passing an explicit [`Client`] around is the
//! primary API; the default exists for scripts and tests.

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use courier_core::{Method, Result};

use crate::config::Config;
use crate::{Client, Request, Response};

static DEFAULT: LazyLock<RwLock<Arc<Client>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Client::new())));

/// The current default client.
#[must_use]
pub fn client() -> Arc<Client> {
    Arc::clone(&DEFAULT.read().unwrap_or_else(PoisonError::into_inner))
}

/// Make `client` the default until the returned guard is dropped.
pub fn replace(client: Arc<Client>) -> Restore {
    let previous = std::mem::replace(
        &mut *DEFAULT.write().unwrap_or_else(PoisonError::into_inner),
        client,
    );
    Restore {
        previous: Some(previous),
    }
}

/// Puts the previous default client back when dropped.
#[must_use = "the previous default client is restored when the guard is dropped"]
#[derive(Debug)]
pub struct Restore {
    previous: Option<Arc<Client>>,
}

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *DEFAULT.write().unwrap_or_else(PoisonError::into_inner) = previous;
        }
    }
}

/// A pooled request bound to the default client.
#[must_use]
pub fn r() -> Request {
    client().r()
}

/// Send a GET request with the default client.
pub async fn get(url: impl Into<String>) -> Result<Response> {
    client().get(url).await
}

/// Send a POST request with the default client.
pub async fn post(url: impl Into<String>) -> Result<Response> {
    client().post(url).await
}

/// Send a PUT request with the default client.
pub async fn put(url: impl Into<String>) -> Result<Response> {
    client().put(url).await
}

/// Send a PATCH request with the default client.
pub async fn patch(url: impl Into<String>) -> Result<Response> {
    client().patch(url).await
}

/// Send a DELETE request with the default client.
pub async fn delete(url: impl Into<String>) -> Result<Response> {
    client().delete(url).await
}

/// Send a HEAD request with the default client.
pub async fn head(url: impl Into<String>) -> Result<Response> {
    client().head(url).await
}

/// Send an OPTIONS request with the default client.
pub async fn options(url: impl Into<String>) -> Result<Response> {
    client().options(url).await
}

/// Send a request configured by a [`Config`] with the default client.
pub async fn send(method: Method, url: impl Into<String>, config: Config) -> Result<Response> {
    client().send(method, url, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_is_scoped() {
        let original = client();

        let mut custom = Client::new();
        custom.set_base_url("http://scoped.test");
        let custom = custom.into_shared();
        {
            let _restore = replace(Arc::clone(&custom));
            assert!(Arc::ptr_eq(&client(), &custom));
            assert!(r().client().is_some_and(|c| Arc::ptr_eq(c, &custom)));
        }

        assert!(Arc::ptr_eq(&client(), &original));
    }
}
