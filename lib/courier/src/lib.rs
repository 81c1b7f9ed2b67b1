//! Async HTTP client with layered configuration.
//!
//! A [`Client`] holds the settings shared by many requests: base URL,
//! headers, query and path parameters, cookies, codecs, hooks and a cookie
//! jar. A [`Request`] adds its own values on top, and the client's values
//! lose whenever both set the same key.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct Repo {
//!     full_name: String,
//! }
//!
//! let mut client = Client::new();
//! client
//!     .set_base_url("https://api.github.com")
//!     .set_header("Accept", "application/vnd.github+json");
//! let client = client.into_shared();
//!
//! let response = client
//!     .r()
//!     .set_path_params([("owner", "rust-lang"), ("repo", "rust")])
//!     .get("/repos/:owner/:repo")
//!     .await?;
//! let repo: Repo = response.json()?;
//! response.close();
//! ```
//!
//! Shorthand functions such as [`get`] use a process-wide default client,
//! see [`default`].

mod client;
mod config;
mod connector;
mod cookie_jar;
pub mod default;
mod hooks;
mod pipeline;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use client::Client;
pub use config::{Config, TransportConfig, TransportConfigBuilder};
pub use connector::https_connector;
pub use cookie_jar::MemoryCookieJar;
pub use default::{delete, get, head, options, patch, post, put, r, send};
pub use hooks::{RequestHook, ResponseHook};
pub use pipeline::DEFAULT_USER_AGENT;
pub use request::{Body, CancelSignal, Payload, Request};
pub use response::Response;
pub use transport::{BoxedService, Transport, TransportFuture};

// Re-export core types
pub use courier_core::{
    CborCodec, Codec, Codecs, CookieJar, Cookies, DEFAULT_BOUNDARY, Error, File, FormData, Header,
    JsonCodec, Method, MultiMap, PathParams, QueryParams, RawRequest, RawResponse, Result,
    StatusCode, ToParams, ValueMap, Version, XmlCodec, header_name,
};

// Re-export crates appearing in public signatures
pub use cookie;
pub use tower;
pub use url;

// Re-export macros
pub use courier_macro::Params;
