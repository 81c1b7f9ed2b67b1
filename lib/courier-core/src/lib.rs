//! Core types for the courier HTTP client.
//!
//! This crate holds the pieces that do not touch the network:
//! - [`Error`] and [`Result`] - Error handling
//! - [`Method`] - HTTP method enum
//! - [`Header`], [`MultiMap`] and [`ValueMap`] - Key/value containers
//! - [`ToParams`] - Trait for flattening values into key/value pairs
//! - [`Pool`] and [`Reset`] - Object recycling
//! - [`Codec`] and [`Codecs`] - JSON, XML and CBOR bodies
//! - [`File`] and [`encode_multipart`] - Multipart uploads
//! - [`RawRequest`] and [`RawResponse`] - Wire-level messages
//! - [`CookieJar`] - Cookie persistence interface

mod codec;
mod cookie_jar;
mod error;
mod file;
mod header;
mod method;
mod multipart;
mod params;
mod pool;
pub mod prelude;
mod raw;

pub use codec::{CborCodec, Codec, Codecs, JsonCodec, Visit, XmlCodec, decode, encode};
pub use cookie_jar::{CookieJar, parse_set_cookies};
pub use error::{Error, Result};
pub use file::File;
pub use header::Header;
pub use method::Method;
pub use multipart::{
    COPY_BUFFER_SIZE, DEFAULT_BOUNDARY, MultipartWriter, encode_multipart, randomize_boundary,
};
pub use params::{Cookies, FormData, MultiMap, PathParams, QueryParams, ToParams, ValueMap};
pub use pool::{DEFAULT_POOL_CAPACITY, Pool, Reset};
pub use raw::{RawRequest, RawResponse};

// Re-export crates that appear in public signatures
pub use cookie;
pub use erased_serde;
pub use http::{StatusCode, Version, header as header_name};
